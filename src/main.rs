//! Mem Game entry point
//!
//! On the web this binds the DOM grid to a `RoundController` and drives it
//! from the animation frame loop. Natively it runs a headless auto-player.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlButtonElement, HtmlElement, MouseEvent};

    use mem_game::{GameEvent, RoundController, Settings, Tile};

    const LIT_COLOR: &str = "lightgreen";
    const MISS_COLOR: &str = "red";
    const START_DISABLED_COLOR: &str = "lightgrey";

    /// Game instance holding the controller and its DOM handles
    struct Game {
        controller: RoundController,
        document: Document,
        start_button: HtmlButtonElement,
        tiles: Vec<(Tile, HtmlElement)>,
    }

    impl Game {
        fn tile_element(&self, tile: Tile) -> Option<&HtmlElement> {
            self.tiles.iter().find(|(t, _)| *t == tile).map(|(_, el)| el)
        }

        fn set_tile_color(&self, tile: Tile, color: &str) {
            match self.tile_element(tile) {
                Some(el) => {
                    let _ = el.style().set_property("background-color", color);
                }
                None => log::warn!("No element for {}", tile),
            }
        }

        fn set_tiles_clickable(&self, clickable: bool) {
            let value = if clickable { "auto" } else { "none" };
            for (_, el) in &self.tiles {
                let _ = el.style().set_property("pointer-events", value);
            }
        }

        fn set_text(&self, id: &str, text: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                el.set_text_content(Some(text));
            }
        }

        fn update_scores(&self) {
            let game = self.controller.game();
            self.set_text("currentScore", &game.streak.to_string());
            self.set_text("highScore", &game.best_streak.to_string());
        }

        /// Reflect controller events in the DOM
        fn apply(&self, events: &[GameEvent]) {
            for event in events {
                match *event {
                    GameEvent::Highlight { tile, .. } | GameEvent::CorrectFeedback { tile } => {
                        self.set_tile_color(tile, LIT_COLOR)
                    }
                    GameEvent::IncorrectFeedback { tile } => self.set_tile_color(tile, MISS_COLOR),
                    GameEvent::Unhighlight { tile, .. } | GameEvent::FeedbackCleared { tile } => {
                        self.set_tile_color(tile, "")
                    }
                    GameEvent::RoundWon { .. } => {
                        self.update_scores();
                        self.set_text(
                            "message",
                            "You got them all correct! Keep going for a new High Score!",
                        );
                    }
                    GameEvent::RoundLost => {
                        self.update_scores();
                        self.set_text("message", "You made a mistake. Better luck next time!");
                    }
                    GameEvent::InputEnabled => self.set_tiles_clickable(true),
                    GameEvent::InputDisabled => self.set_tiles_clickable(false),
                    GameEvent::StartDisabled => {
                        self.start_button.set_disabled(true);
                        let _ = self
                            .start_button
                            .style()
                            .set_property("background-color", START_DISABLED_COLOR);
                        self.set_text("message", "");
                    }
                    GameEvent::StartEnabled => {
                        self.start_button.set_disabled(false);
                        let _ = self.start_button.style().set_property("background-color", "");
                    }
                }
            }
        }

        /// Bring the controller clock to `now_ms` and render what fired
        fn update(&mut self, now_ms: u64) {
            let mut events = Vec::new();
            self.controller.advance_to(now_ms, &mut events);
            self.apply(&events);
        }
    }

    fn now_ms() -> u64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now() as u64)
            .unwrap_or(0)
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Mem Game starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let settings = Settings::load();
        let seed = js_sys::Date::now() as u64;
        let controller = match RoundController::new(settings, seed) {
            Ok(controller) => controller,
            Err(e) => {
                log::error!("Invalid settings: {}", e);
                return;
            }
        };
        log::info!("Game initialized with seed: {}", seed);

        let start_button: HtmlButtonElement = document
            .get_element_by_id("startButton")
            .expect("no start button")
            .dyn_into()
            .expect("start button is not a button");

        let tiles = controller
            .tiles()
            .iter()
            .filter_map(|tile| {
                let el = document
                    .get_element_by_id(&tile.element_id())
                    .and_then(|el| el.dyn_into::<HtmlElement>().ok());
                if el.is_none() {
                    log::warn!("Missing element #{}", tile.element_id());
                }
                el.map(|el| (tile, el))
            })
            .collect();

        let game = Rc::new(RefCell::new(Game {
            controller,
            document,
            start_button,
            tiles,
        }));

        {
            let mut g = game.borrow_mut();
            g.update(now_ms());
            g.set_tiles_clickable(false);
            g.update_scores();
        }

        setup_start_button(game.clone());
        setup_tile_handlers(game.clone());

        request_animation_frame(game);

        log::info!("Mem Game running!");
    }

    fn setup_start_button(game: Rc<RefCell<Game>>) {
        let button = game.borrow().start_button.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            let mut g = game.borrow_mut();
            g.update(now_ms());
            let mut events = Vec::new();
            g.controller.start_round(&mut events);
            g.apply(&events);
            // Slot 0 is due immediately
            g.update(now_ms());
        });
        let _ = button.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_tile_handlers(game: Rc<RefCell<Game>>) {
        let tiles: Vec<(Tile, HtmlElement)> = game.borrow().tiles.clone();
        for (tile, el) in tiles {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut g = game.borrow_mut();
                g.update(now_ms());
                let mut events = Vec::new();
                g.controller.activate(tile, &mut events);
                g.apply(&events);
            });
            let _ = el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        game.borrow_mut().update(time as u64);
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Mem Game (native) starting...");
    log::info!("Native mode runs a headless auto-player - serve the wasm build for the real game");

    if let Err(e) = demo::run(std::env::args().skip(1).collect()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::error::Error;
    use std::path::PathBuf;

    use mem_game::game::random_int_inclusive;
    use mem_game::{GameEvent, Phase, RoundController, Settings};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    /// Max rounds before the auto-player stops
    const MAX_ROUNDS: u32 = 20;
    /// Chance the auto-player presses the right tile
    const ACCURACY: f64 = 0.93;
    /// Pause between simulated clicks (ms)
    const CLICK_GAP_MS: u64 = 400;

    fn print_events(now: u64, events: &mut Vec<GameEvent>) {
        for event in events.drain(..) {
            println!("{:>7} {}", now, event.to_json_line());
        }
    }

    /// Usage: `mem-game [settings.json] [seed]`
    pub fn run(args: Vec<String>) -> Result<(), Box<dyn Error>> {
        let path = args.first().filter(|a| a.ends_with(".json")).map(PathBuf::from);
        let seed = match args.iter().find_map(|a| a.parse::<u64>().ok()) {
            Some(seed) => seed,
            None => std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)?
                .as_millis() as u64,
        };

        let settings = Settings::load_from(path.as_deref())?;
        let mut controller = RoundController::new(settings, seed)?;
        let mut player = Pcg32::seed_from_u64(seed.wrapping_add(1));
        let mut events = Vec::new();
        log::info!("Seed: {}", seed);

        for _ in 0..MAX_ROUNDS {
            controller.start_round(&mut events);
            while controller.phase() == Phase::Playback {
                let Some(due) = controller.next_due() else { break };
                controller.advance_to(due, &mut events);
                print_events(controller.now(), &mut events);
            }

            let expected = controller.sequence().to_vec();
            let mut lost = false;
            for tile in expected {
                let pressed = if player.random_bool(ACCURACY) {
                    tile
                } else {
                    let last = controller.tiles().len() - 1;
                    let index = random_int_inclusive(&mut player, 0, last);
                    controller.tiles().get(index).unwrap_or(tile)
                };
                controller.advance_by(CLICK_GAP_MS, &mut events);
                controller.activate(pressed, &mut events);
                lost |= events.contains(&GameEvent::RoundLost);
                print_events(controller.now(), &mut events);
            }

            let feedback_ms = controller.settings().feedback_ms;
            controller.advance_by(feedback_ms, &mut events);
            print_events(controller.now(), &mut events);

            if lost {
                break;
            }
        }

        let game = controller.game();
        println!(
            "{}",
            serde_json::json!({ "seed": seed, "streak": game.streak, "best_streak": game.best_streak })
        );
        Ok(())
    }
}
