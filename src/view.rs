use std::{
    io::{self, stdin, stdout, Write},
    sync::mpsc,
    thread::{self, JoinHandle},
    time::Duration,
};

use termion::{event::Key, input::TermRead, raw::IntoRawMode};

use crate::{
    bridge::{ConsumerBridge, Frame, GenerationConsumer},
    config::ViewConfig,
    pos, CellGrid, Pos, SimHandle,
};

pub use canvas::Canvas;
mod canvas;

/// Terminal consumer: owns the bridge and redraws on its own refresh tick.
pub struct View {
    thread: JoinHandle<io::Result<()>>,
}

impl View {
    pub fn spawn(bridge: ConsumerBridge, handle: SimHandle, config: ViewConfig) -> Self {
        let thread = thread::spawn(move || view_loop(bridge, handle, config));
        Self { thread }
    }

    /// Waits for the user to quit. Fails if the terminal could not be used.
    pub fn join(self) -> io::Result<()> {
        self.thread
            .join()
            .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "view thread panicked")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCmd {
    Exit,
    Move(Dir),
    TogglePause,
    Step,
    Accelerate,
    Decelerate,
}

fn input_command(key: Key) -> Option<InputCmd> {
    let command = match key {
        Key::Char('q') | Key::Ctrl('c') => InputCmd::Exit,
        Key::Up => InputCmd::Move(Dir::Up),
        Key::Down => InputCmd::Move(Dir::Down),
        Key::Left => InputCmd::Move(Dir::Left),
        Key::Right => InputCmd::Move(Dir::Right),
        Key::Char(' ') => InputCmd::TogglePause,
        Key::Char('n') => InputCmd::Step,
        Key::Char('+') => InputCmd::Accelerate,
        Key::Char('-') => InputCmd::Decelerate,
        _ => return None,
    };
    Some(command)
}

fn input_loop(sender: mpsc::Sender<InputCmd>) {
    for key in stdin().keys() {
        let Ok(key) = key else { break };
        if let Some(command) = input_command(key) {
            if sender.send(command).is_err() {
                break;
            }
        }
    }
}

const SCROLL_STEP: isize = 4;
const SLOWEST_INTERVAL: Duration = Duration::from_secs(2);
const FIRST_SLOWDOWN: Duration = Duration::from_millis(10);

/// Draws delivered generations and remembers what it drew, so scrolling can
/// redraw without waiting for the next generation.
struct Screen {
    canvas: Canvas,
    origin: Pos,
    alive: char,
    dead: char,
    generation: u64,
    population: usize,
}

impl Screen {
    fn new(config: &ViewConfig) -> Self {
        Self {
            canvas: Canvas::from_screen(),
            origin: pos!(0, 0),
            alive: config.alive_char,
            dead: config.dead_char,
            generation: 0,
            population: 0,
        }
    }

    fn scroll(&mut self, direction: Dir, grid: &impl CellGrid) {
        let (dx, dy) = match direction {
            Dir::Up => (0, -SCROLL_STEP),
            Dir::Down => (0, SCROLL_STEP),
            Dir::Left => (-SCROLL_STEP, 0),
            Dir::Right => (SCROLL_STEP, 0),
        };
        let origin = self.origin.scrolled(dx, dy);
        let (view_width, view_height) = self.canvas.size();
        let max_x = grid.width().saturating_sub(view_width);
        let max_y = grid.height().saturating_sub(view_height);
        self.origin = pos!(origin.x.min(max_x), origin.y.min(max_y));
    }
}

impl GenerationConsumer for Screen {
    fn on_generation_ready(&mut self, frame: Frame<'_>) {
        self.generation = frame.generation;
        self.population = frame.grid.population();
        self.canvas
            .paint(frame.grid, self.origin, self.alive, self.dead);
    }
}

fn status_line(screen: &Screen, handle: &SimHandle) -> String {
    let stats = handle.stats();
    let state = if stats.paused { "paused" } else { "running" };
    format!(
        "gen {} | pop {} | {:.1} gen/s | {} workers | {}x{} | {} | q quit, space pause, n step, +/- speed",
        screen.generation,
        screen.population,
        stats.generations_per_second,
        stats.workers,
        stats.width,
        stats.height,
        state,
    )
}

fn view_loop(mut bridge: ConsumerBridge, handle: SimHandle, config: ViewConfig) -> io::Result<()> {
    let mut stdout = stdout().into_raw_mode().map_err(|error| {
        handle.shutdown();
        io::Error::new(error.kind(), format!("terminal unavailable: {error}"))
    })?;

    let (sender, receiver) = mpsc::channel();
    let _input_handle = thread::spawn(|| input_loop(sender));

    let mut screen = Screen::new(&config);
    let result = draw_loop(&mut bridge, &handle, &config, &mut screen, &receiver, &mut stdout);

    let _ = write!(stdout, "{}{}", termion::clear::All, termion::cursor::Goto(1, 1));
    let _ = stdout.flush();
    result
}

/// Applies commands and redraws until the simulation stops. A failed draw
/// shuts the simulation down.
fn draw_loop(
    bridge: &mut ConsumerBridge,
    handle: &SimHandle,
    config: &ViewConfig,
    screen: &mut Screen,
    commands: &mpsc::Receiver<InputCmd>,
    out: &mut impl Write,
) -> io::Result<()> {
    while handle.is_running() {
        let mut moved = false;
        for command in commands.try_iter() {
            match command {
                InputCmd::Exit => {
                    handle.shutdown();
                    break;
                }
                InputCmd::Move(direction) => {
                    screen.scroll(direction, bridge.latest());
                    moved = true;
                }
                InputCmd::TogglePause => {
                    if handle.stats().paused {
                        handle.resume();
                    } else {
                        handle.pause();
                    }
                }
                InputCmd::Step => handle.step(1),
                InputCmd::Accelerate => {
                    handle.set_generation_interval(handle.generation_interval() / 2);
                }
                InputCmd::Decelerate => {
                    let slower = (handle.generation_interval() * 2).max(FIRST_SLOWDOWN);
                    handle.set_generation_interval(slower.min(SLOWEST_INTERVAL));
                }
            }
        }

        if !bridge.dispatch(&mut *screen) && moved {
            let generation = screen.generation;
            screen.on_generation_ready(Frame {
                generation,
                grid: bridge.latest(),
            });
        }
        screen.canvas.set_status(status_line(screen, handle));
        if let Err(error) = screen.canvas.display(&mut *out) {
            handle.shutdown();
            return Err(error);
        }
        thread::sleep(config.refresh_interval());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, Grid, Sim};

    struct BrokenTerminal;

    impl Write for BrokenTerminal {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn screen(width: usize, height: usize) -> Screen {
        Screen {
            canvas: Canvas::new(width, height),
            origin: pos!(0, 0),
            alive: '#',
            dead: ' ',
            generation: 0,
            population: 0,
        }
    }

    fn quick_refresh() -> ViewConfig {
        ViewConfig {
            refresh_interval_ms: 1,
            ..ViewConfig::default()
        }
    }

    #[test]
    fn draw_failure_is_reported_and_stops_the_simulation() {
        let seed = Grid::from_actives(4, 4, [pos!(1, 1)]).unwrap();
        let (sim, mut bridge) = Sim::spawn(&seed, &EngineConfig::with_workers(2)).unwrap();
        let handle = sim.handle();
        let (_sender, commands) = mpsc::channel();

        let result = draw_loop(
            &mut bridge,
            &handle,
            &quick_refresh(),
            &mut screen(4, 4),
            &commands,
            &mut BrokenTerminal,
        );
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
        assert!(!handle.is_running());
        sim.shutdown().unwrap();
    }

    #[test]
    fn exit_command_ends_drawing_cleanly() {
        let seed = Grid::from_actives(4, 4, [pos!(1, 1)]).unwrap();
        let (sim, mut bridge) = Sim::spawn(&seed, &EngineConfig::with_workers(2)).unwrap();
        let handle = sim.handle();
        let (sender, commands) = mpsc::channel();
        sender.send(InputCmd::Exit).unwrap();

        let mut out = Vec::new();
        let result = draw_loop(
            &mut bridge,
            &handle,
            &quick_refresh(),
            &mut screen(4, 4),
            &commands,
            &mut out,
        );
        assert!(result.is_ok());
        assert!(!out.is_empty());
        assert!(!handle.is_running());
        sim.shutdown().unwrap();
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(input_command(Key::Char('q')), Some(InputCmd::Exit));
        assert_eq!(input_command(Key::Left), Some(InputCmd::Move(Dir::Left)));
        assert_eq!(input_command(Key::Char(' ')), Some(InputCmd::TogglePause));
        assert_eq!(input_command(Key::Char('+')), Some(InputCmd::Accelerate));
        assert_eq!(input_command(Key::Char('z')), None);
    }

    #[test]
    fn scrolling_stays_on_the_grid() {
        let grid = Grid::new(20, 10).unwrap();
        let mut screen = screen(8, 4);
        screen.scroll(Dir::Left, &grid);
        assert_eq!(screen.origin, pos!(0, 0));
        for _ in 0..10 {
            screen.scroll(Dir::Right, &grid);
            screen.scroll(Dir::Down, &grid);
        }
        assert_eq!(screen.origin, pos!(12, 6));
    }

    #[test]
    fn screen_records_frames() {
        let grid = Grid::from_actives(3, 3, [pos!(0, 0), pos!(2, 2)]).unwrap();
        let mut screen = screen(3, 3);
        screen.on_generation_ready(Frame {
            generation: 4,
            grid: &grid,
        });
        assert_eq!((screen.generation, screen.population), (4, 2));
    }
}
