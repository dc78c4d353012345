//! View table and access gate.
//!
//! The gate is a pure function of a session snapshot and a view. The
//! [`Navigator`] is the stateful part: it remembers where the console is and
//! follows the session manager's invalidation events back to the login view.

use crate::session::{Session, SessionEvent, SessionManager};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Landing,
    About,
    Features,
    Login,
    Register,
    ForgotPassword,
    Dashboard,
    Predict,
    History,
    Profile,
    AdminDashboard,
    TrainingData,
    Models,
    Users,
    Upload,
}

/// (path, view, requires auth, requires admin)
const ROUTES: &[(&str, View, bool, bool)] = &[
    ("/", View::Landing, false, false),
    ("/about", View::About, false, false),
    ("/features", View::Features, false, false),
    ("/login", View::Login, false, false),
    ("/register", View::Register, false, false),
    ("/forgot-password", View::ForgotPassword, false, false),
    ("/dashboard", View::Dashboard, true, false),
    ("/dashboard/predict", View::Predict, true, false),
    ("/dashboard/history", View::History, true, false),
    ("/dashboard/profile", View::Profile, true, false),
    ("/admin", View::AdminDashboard, true, true),
    ("/admin/training-data", View::TrainingData, true, true),
    ("/admin/models", View::Models, true, true),
    ("/admin/users", View::Users, true, true),
    ("/admin/upload", View::Upload, true, true),
];

impl View {
    pub fn all() -> impl Iterator<Item = View> {
        ROUTES.iter().map(|(_, view, _, _)| *view)
    }

    fn entry(&self) -> &'static (&'static str, View, bool, bool) {
        ROUTES
            .iter()
            .find(|(_, view, _, _)| view == self)
            .unwrap_or(&ROUTES[0])
    }

    pub fn path(&self) -> &'static str {
        self.entry().0
    }

    pub fn requires_auth(&self) -> bool {
        self.entry().2
    }

    pub fn requires_admin(&self) -> bool {
        self.entry().3
    }

    /// Resolve a path. Trailing slashes are ignored; unknown paths are `None`.
    pub fn from_path(path: &str) -> Option<View> {
        let trimmed = path.trim();
        let normalized = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };
        ROUTES
            .iter()
            .find(|(p, _, _, _)| *p == normalized)
            .map(|(_, view, _, _)| *view)
    }

    pub fn title(&self) -> &'static str {
        match self {
            View::Landing => "OrthoDecision",
            View::About => "About",
            View::Features => "Features",
            View::Login => "Login",
            View::Register => "Register",
            View::ForgotPassword => "Forgot Password",
            View::Dashboard => "Dashboard",
            View::Predict => "New Prediction",
            View::History => "Prediction History",
            View::Profile => "Profile",
            View::AdminDashboard => "Admin Dashboard",
            View::TrainingData => "Training Data",
            View::Models => "Model Management",
            View::Users => "User Management",
            View::Upload => "Upload Training Data",
        }
    }
}

/// Result of gating one navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Render(View),
    /// Session state is still being resolved
    Loading,
    Redirect(View),
}

pub fn gate(session: &Session, view: View) -> Outcome {
    if session.loading() {
        return Outcome::Loading;
    }
    if !view.requires_auth() {
        return Outcome::Render(view);
    }
    if !session.is_authenticated() {
        return Outcome::Redirect(View::Login);
    }
    if view.requires_admin() && !session.is_admin() {
        return Outcome::Redirect(View::Dashboard);
    }
    Outcome::Render(view)
}

/// Gate a raw path; unknown paths fall through to the landing view
pub fn resolve(session: &Session, path: &str) -> Outcome {
    match View::from_path(path) {
        Some(view) => gate(session, view),
        None => Outcome::Redirect(View::Landing),
    }
}

pub struct Navigator {
    session: Arc<SessionManager>,
    current: Arc<Mutex<View>>,
}

impl Navigator {
    pub fn new(session: Arc<SessionManager>) -> Self {
        let current = Arc::new(Mutex::new(View::Landing));
        let watched = current.clone();
        session.subscribe(move |event| {
            if *event == SessionEvent::Invalidated {
                let mut view = watched.lock();
                if *view != View::Login {
                    tracing::info!(from = view.path(), "session invalidated, returning to login");
                    *view = View::Login;
                }
            }
        });
        Self { session, current }
    }

    pub fn current(&self) -> View {
        *self.current.lock()
    }

    /// Navigate to `path`, following redirects, and return the final outcome.
    /// `Loading` leaves the current view unchanged.
    pub fn navigate(&self, path: &str) -> Outcome {
        let snapshot = self.session.current_snapshot();
        let mut outcome = resolve(&snapshot, path);
        // Redirect targets are public or plain authenticated views, so this settles quickly
        for _ in 0..ROUTES.len() {
            match outcome {
                Outcome::Redirect(target) => {
                    let next = gate(&snapshot, target);
                    if next == Outcome::Render(target) {
                        break;
                    }
                    outcome = next;
                }
                _ => break,
            }
        }

        match outcome {
            Outcome::Render(view) | Outcome::Redirect(view) => {
                tracing::debug!(path, view = view.path(), "navigated");
                *self.current.lock() = view;
            }
            Outcome::Loading => {}
        }
        outcome
    }

    /// Re-evaluate the current view against the latest session
    pub fn revalidate(&self) -> Outcome {
        let path = self.current().path();
        self.navigate(path)
    }
}
