use std::{env::args, process::exit};

use columnlife::{
    config::{parse_args, Invocation, USAGE},
    loader, Sim, View,
};

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("[error] {message}");
    exit(1);
}

pub fn main() {
    let args = match parse_args(args().skip(1)) {
        Ok(Invocation::Run(args)) => args,
        Ok(Invocation::Help) => {
            println!("{USAGE}");
            return;
        }
        Err(error) => {
            eprintln!("{USAGE}\n");
            fail(error);
        }
    };

    let seed = loader::for_path(&args.seed)
        .load()
        .unwrap_or_else(|error| fail(error));
    let (simulation, bridge) =
        Sim::spawn(&seed, &args.config.engine).unwrap_or_else(|error| fail(error));
    let view = View::spawn(bridge, simulation.handle(), args.config.view);

    let viewed = view.join();
    let stopped = simulation.shutdown();
    if let Err(error) = viewed {
        fail(error);
    }
    match stopped {
        Ok(generation) => println!("stopped after {generation} generations"),
        Err(error) => fail(error),
    }
}
