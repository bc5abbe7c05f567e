use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use thiserror::Error;

use crate::app::constants::HOTKEY_POLL_INTERVAL;
use crate::model::HotkeyConfig;

#[derive(Debug, Error)]
pub(crate) enum HotkeyError {
    #[error("unsupported modifier: {0}")]
    Modifier(String),
    #[error("unsupported key: {0}")]
    Key(String),
    #[error("global hotkeys are not available in a {0} session")]
    Unsupported(String),
    #[error("global hotkeys on {0} need a GUI event loop, which a terminal app does not run")]
    NoEventLoop(String),
    #[error("hotkey registration failed: {0}")]
    Register(String),
}

/// Delivers key presses to a callback until stopped. The callback runs on
/// the listener's own thread.
pub(crate) trait KeyListener {
    fn start(&mut self, on_press: Box<dyn Fn() + Send>) -> Result<(), HotkeyError>;
    fn stop(&mut self) -> Result<(), HotkeyError>;
}

trait HotkeyRegistry {
    fn grab(&self, hotkey: HotKey) -> Result<(), HotkeyError>;
    fn release(&self, hotkey: HotKey) -> Result<(), HotkeyError>;
}

impl HotkeyRegistry for GlobalHotKeyManager {
    fn grab(&self, hotkey: HotKey) -> Result<(), HotkeyError> {
        self.register(hotkey)
            .map_err(|err| HotkeyError::Register(err.to_string()))
    }

    fn release(&self, hotkey: HotKey) -> Result<(), HotkeyError> {
        self.unregister(hotkey)
            .map_err(|err| HotkeyError::Register(err.to_string()))
    }
}

type ConnectRegistry = Box<dyn Fn() -> Result<Box<dyn HotkeyRegistry>, HotkeyError>>;
type PressSource = Arc<dyn Fn(Duration) -> Option<u32> + Send + Sync>;

pub(crate) struct GlobalHotkeyListener {
    hotkey: HotKey,
    connect: ConnectRegistry,
    presses: PressSource,
    registry: Option<Box<dyn HotkeyRegistry>>,
    stop: Arc<AtomicBool>,
}

impl GlobalHotkeyListener {
    pub(crate) fn new(config: &HotkeyConfig) -> Result<Self, HotkeyError> {
        Ok(Self::with_registry(
            parse_hotkey(config)?,
            Box::new(connect_native),
            Arc::new(next_native_press),
        ))
    }

    fn with_registry(hotkey: HotKey, connect: ConnectRegistry, presses: PressSource) -> Self {
        Self {
            hotkey,
            connect,
            presses,
            registry: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl KeyListener for GlobalHotkeyListener {
    fn start(&mut self, on_press: Box<dyn Fn() + Send>) -> Result<(), HotkeyError> {
        let registry = match self.registry.take() {
            Some(registry) => registry,
            None => (self.connect)()?,
        };
        registry.grab(self.hotkey)?;
        self.registry = Some(registry);

        let stop = Arc::new(AtomicBool::new(false));
        self.stop = Arc::clone(&stop);
        spawn_press_worker(self.hotkey.id(), stop, Arc::clone(&self.presses), on_press);
        Ok(())
    }

    // Does not wait for a press still being handled; its worker exits once
    // that upload returns.
    fn stop(&mut self) -> Result<(), HotkeyError> {
        self.stop.store(true, Ordering::Relaxed);
        let Some(registry) = self.registry.as_ref() else {
            return Ok(());
        };
        let released = registry.release(self.hotkey);
        if released.is_err() {
            self.registry = None;
        }
        released
    }
}

fn spawn_press_worker(
    id: u32,
    stop: Arc<AtomicBool>,
    presses: PressSource,
    on_press: Box<dyn Fn() + Send>,
) {
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            if presses(HOTKEY_POLL_INTERVAL) == Some(id) && !stop.load(Ordering::Relaxed) {
                on_press();
            }
        }
    });
}

fn connect_native() -> Result<Box<dyn HotkeyRegistry>, HotkeyError> {
    check_platform(std::env::consts::OS, &current_session_type())?;
    let manager =
        GlobalHotKeyManager::new().map_err(|err| HotkeyError::Register(err.to_string()))?;
    Ok(Box::new(manager))
}

fn next_native_press(timeout: Duration) -> Option<u32> {
    let event = GlobalHotKeyEvent::receiver().recv_timeout(timeout).ok()?;
    matches!(event.state, HotKeyState::Pressed).then_some(event.id)
}

pub(crate) fn parse_hotkey(config: &HotkeyConfig) -> Result<HotKey, HotkeyError> {
    let modifiers = parse_modifiers(&config.modifiers)?;
    let code = parse_key_code(&config.key)?;
    Ok(HotKey::new(modifiers, code))
}

pub(crate) fn hotkey_label(config: &HotkeyConfig) -> String {
    let mut parts: Vec<String> = config
        .modifiers
        .split(|c: char| c == '+' || c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    parts.push(config.key.trim().to_string());
    parts.join("+")
}

fn parse_modifier_token(token: &str) -> Option<Modifiers> {
    match token {
        "control" | "ctrl" => Some(Modifiers::CONTROL),
        "shift" => Some(Modifiers::SHIFT),
        "alt" | "option" => Some(Modifiers::ALT),
        "command" | "cmd" | "super" | "meta" => Some(Modifiers::SUPER),
        _ => None,
    }
}

fn parse_modifiers(raw: &str) -> Result<Option<Modifiers>, HotkeyError> {
    let mut modifiers = Modifiers::empty();
    for token in raw
        .split(|c: char| c == '+' || c == ',' || c.is_whitespace())
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
    {
        modifiers |= parse_modifier_token(&token).ok_or(HotkeyError::Modifier(token))?;
    }
    if modifiers.is_empty() {
        Ok(None)
    } else {
        Ok(Some(modifiers))
    }
}

fn parse_key_code(raw: &str) -> Result<Code, HotkeyError> {
    let normalized: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .to_uppercase();
    let code = match normalized.as_str() {
        "PRINTSCREEN" | "PRINT" | "PRTSC" | "SYSRQ" => Code::PrintScreen,
        "SCROLLLOCK" => Code::ScrollLock,
        "PAUSE" => Code::Pause,
        "INSERT" => Code::Insert,
        "HOME" => Code::Home,
        "END" => Code::End,
        "F1" => Code::F1,
        "F2" => Code::F2,
        "F3" => Code::F3,
        "F4" => Code::F4,
        "F5" => Code::F5,
        "F6" => Code::F6,
        "F7" => Code::F7,
        "F8" => Code::F8,
        "F9" => Code::F9,
        "F10" => Code::F10,
        "F11" => Code::F11,
        "F12" => Code::F12,
        "A" => Code::KeyA,
        "B" => Code::KeyB,
        "C" => Code::KeyC,
        "D" => Code::KeyD,
        "E" => Code::KeyE,
        "F" => Code::KeyF,
        "G" => Code::KeyG,
        "H" => Code::KeyH,
        "I" => Code::KeyI,
        "J" => Code::KeyJ,
        "K" => Code::KeyK,
        "L" => Code::KeyL,
        "M" => Code::KeyM,
        "N" => Code::KeyN,
        "O" => Code::KeyO,
        "P" => Code::KeyP,
        "Q" => Code::KeyQ,
        "R" => Code::KeyR,
        "S" => Code::KeyS,
        "T" => Code::KeyT,
        "U" => Code::KeyU,
        "V" => Code::KeyV,
        "W" => Code::KeyW,
        "X" => Code::KeyX,
        "Y" => Code::KeyY,
        "Z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        _ => return Err(HotkeyError::Key(raw.trim().to_string())),
    };
    Ok(code)
}

fn current_session_type() -> String {
    std::env::var("XDG_SESSION_TYPE")
        .unwrap_or_else(|_| "unknown".to_string())
        .to_lowercase()
}

// Windows and macOS only deliver hotkey events through a message loop on the
// thread that owns the manager. Wayland has no global grab at all.
fn check_platform(os: &str, session: &str) -> Result<(), HotkeyError> {
    match os {
        "windows" | "macos" => Err(HotkeyError::NoEventLoop(os.to_string())),
        _ if session == "wayland" => Err(HotkeyError::Unsupported(session.to_string())),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct MockKeyListener {
    callback: Arc<std::sync::Mutex<Option<Box<dyn Fn() + Send>>>>,
    fail_start: bool,
}

#[cfg(test)]
#[derive(Clone)]
pub(crate) struct MockKeyHandle {
    callback: Arc<std::sync::Mutex<Option<Box<dyn Fn() + Send>>>>,
}

#[cfg(test)]
impl MockKeyListener {
    pub(crate) fn new() -> (Self, MockKeyHandle) {
        let listener = Self::default();
        let handle = MockKeyHandle {
            callback: Arc::clone(&listener.callback),
        };
        (listener, handle)
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl MockKeyHandle {
    pub(crate) fn press(&self) -> bool {
        match self.callback.lock().unwrap().as_ref() {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
impl KeyListener for MockKeyListener {
    fn start(&mut self, on_press: Box<dyn Fn() + Send>) -> Result<(), HotkeyError> {
        if self.fail_start {
            return Err(HotkeyError::Unsupported("wayland".to_string()));
        }
        *self.callback.lock().unwrap() = Some(on_press);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HotkeyError> {
        *self.callback.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(modifiers: &str, key: &str) -> HotkeyConfig {
        HotkeyConfig {
            modifiers: modifiers.to_string(),
            key: key.to_string(),
        }
    }

    #[test]
    fn default_hotkey_is_bare_print_screen() {
        let hotkey = parse_hotkey(&HotkeyConfig::default()).unwrap();
        assert_eq!(hotkey, HotKey::new(None, Code::PrintScreen));
    }

    #[test]
    fn parses_modifier_combinations() {
        let hotkey = parse_hotkey(&config("ctrl+Shift", "s")).unwrap();
        assert_eq!(
            hotkey,
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::KeyS)
        );
        assert_eq!(
            parse_hotkey(&config("", "print_screen")).unwrap(),
            HotKey::new(None, Code::PrintScreen)
        );
        assert_eq!(
            parse_hotkey(&config("alt", "F9")).unwrap(),
            HotKey::new(Some(Modifiers::ALT), Code::F9)
        );
    }

    #[test]
    fn rejects_unknown_tokens() {
        assert!(matches!(
            parse_hotkey(&config("hyper", "s")),
            Err(HotkeyError::Modifier(token)) if token == "hyper"
        ));
        assert!(matches!(
            parse_hotkey(&config("", "Menu")),
            Err(HotkeyError::Key(key)) if key == "Menu"
        ));
    }

    #[test]
    fn label_reads_like_a_shortcut() {
        assert_eq!(hotkey_label(&HotkeyConfig::default()), "PrintScreen");
        assert_eq!(hotkey_label(&config("ctrl shift", "S")), "Ctrl+Shift+S");
    }

    #[test]
    fn mock_listener_fires_only_while_started() {
        let (mut listener, handle) = MockKeyListener::new();
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        assert!(!handle.press());
        let counter = Arc::clone(&hits);
        listener
            .start(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert!(handle.press());
        listener.stop().unwrap();
        assert!(!handle.press());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[derive(Clone, Default)]
    struct FakeRegistry {
        calls: Arc<std::sync::Mutex<Vec<&'static str>>>,
        fail_release: bool,
    }

    impl HotkeyRegistry for FakeRegistry {
        fn grab(&self, _hotkey: HotKey) -> Result<(), HotkeyError> {
            self.calls.lock().unwrap().push("grab");
            Ok(())
        }

        fn release(&self, _hotkey: HotKey) -> Result<(), HotkeyError> {
            self.calls.lock().unwrap().push("release");
            if self.fail_release {
                return Err(HotkeyError::Register("still grabbed".to_string()));
            }
            Ok(())
        }
    }

    fn fake_listener(
        registry: FakeRegistry,
        presses: PressSource,
    ) -> (GlobalHotkeyListener, Arc<std::sync::atomic::AtomicUsize>) {
        let connects = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&connects);
        let connect: ConnectRegistry = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(registry.clone()) as Box<dyn HotkeyRegistry>)
        });
        let hotkey = parse_hotkey(&HotkeyConfig::default()).unwrap();
        (
            GlobalHotkeyListener::with_registry(hotkey, connect, presses),
            connects,
        )
    }

    fn no_presses() -> PressSource {
        Arc::new(|timeout: Duration| {
            std::thread::sleep(timeout);
            None
        })
    }

    #[test]
    fn refuses_platforms_without_a_usable_event_loop() {
        assert!(matches!(
            check_platform("windows", "unknown"),
            Err(HotkeyError::NoEventLoop(os)) if os == "windows"
        ));
        assert!(matches!(
            check_platform("macos", "unknown"),
            Err(HotkeyError::NoEventLoop(os)) if os == "macos"
        ));
        assert!(matches!(
            check_platform("linux", "wayland"),
            Err(HotkeyError::Unsupported(session)) if session == "wayland"
        ));
        assert!(check_platform("linux", "x11").is_ok());
        assert!(check_platform("freebsd", "unknown").is_ok());
    }

    #[test]
    fn stop_returns_while_a_press_is_still_uploading() {
        let id = parse_hotkey(&HotkeyConfig::default()).unwrap().id();
        let fired = AtomicBool::new(false);
        let presses: PressSource = Arc::new(move |timeout: Duration| {
            if !fired.swap(true, Ordering::SeqCst) {
                return Some(id);
            }
            std::thread::sleep(timeout);
            None
        });
        let registry = FakeRegistry::default();
        let (mut listener, _) = fake_listener(registry.clone(), presses);
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        listener
            .start(Box::new(move || {
                let _ = entered_tx.send(());
                let _ = release_rx.recv_timeout(Duration::from_secs(5));
            }))
            .unwrap();
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        let started = std::time::Instant::now();
        listener.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(*registry.calls.lock().unwrap(), vec!["grab", "release"]);
        let _ = release_tx.send(());
    }

    #[test]
    fn failed_release_reconnects_on_next_start() {
        let registry = FakeRegistry {
            fail_release: true,
            ..FakeRegistry::default()
        };
        let (mut listener, connects) = fake_listener(registry.clone(), no_presses());

        listener.start(Box::new(|| {})).unwrap();
        assert!(listener.stop().is_err());
        listener.start(Box::new(|| {})).unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert_eq!(
            *registry.calls.lock().unwrap(),
            vec!["grab", "release", "grab"]
        );
        assert!(listener.stop().is_err());
    }

    #[test]
    fn clean_release_reuses_the_registry() {
        let registry = FakeRegistry::default();
        let (mut listener, connects) = fake_listener(registry, no_presses());

        listener.start(Box::new(|| {})).unwrap();
        listener.stop().unwrap();
        listener.start(Box::new(|| {})).unwrap();
        listener.stop().unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }
}
