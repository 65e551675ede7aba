//! Terminal stand-ins for the view layer hooks

use courier_core::{Navigator, Notifier, Route};
use parking_lot::Mutex;
use tracing::debug;

/// Records where the stores asked to navigate
#[derive(Default)]
pub struct TerminalNavigator {
    last: Mutex<Option<Route>>,
}

impl TerminalNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_route(&self) -> Option<Route> {
        *self.last.lock()
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: Route) {
        debug!("Navigate to {}", route.path());
        *self.last.lock() = Some(route);
    }
}

/// Prints notices on stdout
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        println!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigator_remembers_last_route() {
        let navigator = TerminalNavigator::new();
        assert_eq!(navigator.last_route(), None);

        navigator.navigate(Route::Home);
        navigator.navigate(Route::Login);
        assert_eq!(navigator.last_route(), Some(Route::Login));
    }
}
