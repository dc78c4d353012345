use crate::config::Config;
use crate::dashboard::{self, format_accuracy, format_timestamp};
use crate::error::ApiError;
use crate::measurements::{self, confidence_label};
use crate::models::{
    outcome_label, ManualTrainingEntry, ModelVersion, NewUser, PredictionRecord, PredictionResult,
    TrainingEntry, User, VerificationFilter,
};
use crate::router::{Navigator, Outcome, View};
use crate::services::{ProfileForm, Services};
use crate::session::{SessionEvent, SessionManager};
use crate::transcript::Transcript;
use anyhow::{bail, Context as _, Result};
use rustyline::completion::Completer;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{ColorMode, DefaultEditor, Editor, Helper};
use std::borrow::Cow;
use std::cell::RefCell;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Context {
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub navigator: Navigator,
    pub services: Services,
    pub transcript: RefCell<Option<Transcript>>,
    pub session_id: String,
    invalidated: Arc<AtomicBool>,
    /// Filter and 1-based page of the training data listing
    training_view: RefCell<(VerificationFilter, usize)>,
}

pub enum Flow {
    Continue,
    Exit,
}

impl Context {
    pub fn new(
        config: Config,
        session: Arc<SessionManager>,
        transcript: Option<Transcript>,
        session_id: String,
    ) -> Self {
        let navigator = Navigator::new(session.clone());
        let services = Services::new(session.api().clone());

        let invalidated = Arc::new(AtomicBool::new(false));
        let flag = invalidated.clone();
        session.subscribe(move |event| {
            if *event == SessionEvent::Invalidated {
                flag.store(true, Ordering::SeqCst);
            }
        });

        Self {
            config,
            session,
            navigator,
            services,
            transcript: RefCell::new(transcript),
            session_id,
            invalidated,
            training_view: RefCell::new((VerificationFilter::All, 1)),
        }
    }

    fn log<F>(&self, write: F)
    where
        F: FnOnce(&mut Transcript) -> Result<()>,
    {
        if let Some(transcript) = self.transcript.borrow_mut().as_mut() {
            if let Err(e) = write(transcript) {
                tracing::warn!(error = %e, "failed to write transcript");
            }
        }
    }

    /// Pick up a saved login, if there is one
    pub fn start(&self) {
        let base_url = self.config.base_url().to_string();
        self.log(|t| t.session_start(&base_url));

        match self.session.bootstrap() {
            Ok(Some(user)) => {
                println!("Welcome back, {}", user.username);
                self.navigator.navigate(View::Dashboard.path());
            }
            Ok(None) => {}
            Err(e) if e.is_network() => {
                println!("{} Saved login kept; run /refresh to retry.", e.user_message());
            }
            Err(e) if e.is_auth() => {
                tracing::debug!(error = %e, "saved login rejected");
                println!("Saved login is no longer valid.");
            }
            Err(e) => println!("Could not restore saved login: {}", e.user_message()),
        }
        // A rejected saved token needs no second notice
        self.invalidated.store(false, Ordering::SeqCst);
    }

    fn check_invalidated(&self) {
        if self.invalidated.swap(false, Ordering::SeqCst) {
            println!("Session ended by the server; now at {}", self.navigator.current().path());
            self.log(|t| t.session_invalidated());
        }
    }

    pub fn prompt(&self) -> String {
        format!("orthodash:{}> ", self.navigator.current().path())
    }
}

pub fn run_once(ctx: &Context, line: &str) -> Result<()> {
    execute(ctx, line).map(|_| ())
}

pub fn run_repl(ctx: &Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    if let Some(history) = ctx.config.history_file() {
        let _ = rl.load_history(&history);
    }

    println!("orthodash - type /help for commands, /exit to quit");

    loop {
        match rl.readline(&ctx.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                // Lines with passwords stay out of the history file
                if !line.starts_with("/login") {
                    rl.add_history_entry(line)?;
                }

                match execute(ctx, line) {
                    Ok(Flow::Exit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => report(&e),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Some(history) = ctx.config.history_file() {
        if let Some(parent) = history.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = rl.save_history(&history) {
            tracing::debug!(error = %e, "could not save history");
        }
    }
    Ok(())
}

pub fn report(err: &anyhow::Error) {
    match err.downcast_ref::<ApiError>() {
        Some(api) => eprintln!("Error: {}", api.user_message()),
        None => eprintln!("Error: {:#}", err),
    }
}

pub fn execute(ctx: &Context, line: &str) -> Result<Flow> {
    let words = shell_words::split(line).context("Could not parse command")?;
    let Some((name, rest)) = words.split_first() else {
        return Ok(Flow::Continue);
    };
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();

    let view = ctx.navigator.current().path();
    ctx.log(|t| t.command(name, view));

    let result = dispatch(ctx, name, &args);
    ctx.check_invalidated();
    if let Err(e) = &result {
        if let Some(api) = e.downcast_ref::<ApiError>() {
            ctx.log(|t| t.request_failed(name, api));
        }
    }
    result
}

fn dispatch(ctx: &Context, name: &str, args: &[&str]) -> Result<Flow> {
    match name {
        "/exit" | "/quit" => return Ok(Flow::Exit),
        "/help" => print_help(),
        "/go" => match args.first() {
            Some(path) => go(ctx, path)?,
            None => print_pages(ctx),
        },
        "/dashboard" => go(ctx, View::Dashboard.path())?,
        "/admin" => go(ctx, View::AdminDashboard.path())?,
        "/login" => login(ctx, args)?,
        "/logout" => {
            ctx.session.logout();
            ctx.log(|t| t.logout());
            ctx.navigator.navigate(View::Login.path());
            println!("Logged out");
        }
        "/whoami" => whoami(ctx),
        "/session" => {
            println!("Session: {}", ctx.session_id);
            println!("Backend: {}", ctx.config.base_url());
            if let Some(transcript) = ctx.transcript.borrow().as_ref() {
                println!("Transcript: {:?}", transcript.path);
            }
        }
        "/refresh" => {
            let user = ctx.session.refresh()?;
            println!("Session refreshed for {}", user.username);
            ctx.navigator.revalidate();
        }
        "/fields" => print_fields(args.first().copied())?,
        "/predict" => predict(ctx, args)?,
        "/history" => match args.first() {
            Some(id) => prediction_detail(ctx, parse_id(id)?)?,
            None => go(ctx, View::History.path())?,
        },
        "/profile" => profile(ctx, args)?,
        "/password" => change_password(ctx)?,
        "/users" => go(ctx, View::Users.path())?,
        "/user" => user_command(ctx, args)?,
        "/training" => training_command(ctx, args)?,
        "/upload" => upload(ctx, args)?,
        "/models" => models_command(ctx, args)?,
        _ => bail!("Unknown command: {} (try /help)", name),
    }
    Ok(Flow::Continue)
}

fn print_help() {
    println!("Commands:");
    println!("  /exit                  - quit");
    println!("  /help                  - show commands");
    println!("  /go [path]             - open a page, or list pages (e.g. /about, /admin/models)");
    println!("  /session               - show console session info");
    println!("Session:");
    println!("  /login <user> [pass]   - sign in (omit pass to type it hidden)");
    println!("  /logout                - sign out and forget the saved login");
    println!("  /whoami                - show the current session");
    println!("  /refresh               - reload your account from the server");
    println!("Predictions:");
    println!("  /fields [group]        - list measurement names");
    println!("  /predict <file>        - submit measurements from a .toml or .json file");
    println!("  /history [id]          - list past predictions, or show one in full");
    println!("  /profile               - show your profile");
    println!("  /profile email <addr>  - change your email");
    println!("  /password              - change your password");
    println!("Administration:");
    println!("  /admin                 - overview statistics");
    println!("  /users                 - list users");
    println!("  /user add <username> <email> <password> [--admin] [--inactive]");
    println!("  /user admin <id> on|off");
    println!("  /user active <id> on|off");
    println!("  /user deactivate <id>");
    println!("  /training [all|verified|unverified] [page]");
    println!("  /training verify|reject <id>");
    println!("  /training add <file> extraction|non-extraction");
    println!("  /upload <file.xlsx>    - upload a training spreadsheet");
    println!("  /models                - list model versions");
    println!("  /models activate <id>");
    println!("  /models train <description>");
}

/// Navigate to a page that a command needs, refusing when the gate redirects
fn enter(ctx: &Context, view: View) -> Result<()> {
    match ctx.navigator.navigate(view.path()) {
        Outcome::Render(_) => Ok(()),
        Outcome::Loading => bail!("Session is still loading, try again"),
        Outcome::Redirect(View::Login) => bail!("Please log in first: /login <username>"),
        Outcome::Redirect(View::Dashboard) => bail!("Admin access required"),
        Outcome::Redirect(other) => bail!("Not available; now at {}", other.path()),
    }
}

fn go(ctx: &Context, path: &str) -> Result<()> {
    match ctx.navigator.navigate(path) {
        Outcome::Render(view) => render_view(ctx, view),
        Outcome::Loading => {
            println!("Loading...");
            Ok(())
        }
        Outcome::Redirect(view) => {
            match view {
                View::Login => println!("Please log in to continue."),
                View::Dashboard => println!("Admin access required."),
                _ => println!("Page not found: {}", path),
            }
            render_view(ctx, view)
        }
    }
}

fn render_view(ctx: &Context, view: View) -> Result<()> {
    println!("== {} ({}) ==", view.title(), view.path());
    match view {
        View::Landing => {
            println!("Orthodontic treatment decision support.");
            println!("See /go /about and /go /features, or /login to start.");
        }
        View::About => {
            println!("Predicts whether an orthodontic case needs extraction from");
            println!("photographic, model and cephalometric measurements.");
        }
        View::Features => {
            for group in measurements::GROUPS {
                println!("  - {} ({} fields)", group.title, group.fields.len());
            }
            println!("  - Prediction history, model versions and training data management");
        }
        View::Login => println!("Sign in with /login <username>"),
        View::Register => println!("Accounts are created by an administrator."),
        View::ForgotPassword => println!("Ask an administrator to reset your password."),
        View::Dashboard => {
            if let Some(user) = ctx.session.current_snapshot().user {
                println!("Welcome, {}", user.username);
            }
            let recent = dashboard::recent_predictions(&ctx.services)?;
            println!("Recent predictions:");
            print_history(&recent);
        }
        View::Predict => {
            println!("Submit measurements with /predict <file>. Run /fields for names.");
        }
        View::History => print_history(&ctx.services.prediction_history()?),
        View::Profile => whoami(ctx),
        View::AdminDashboard => {
            let stats = dashboard::admin_stats(&ctx.services)?;
            println!("  Predictions:          {}", stats.predictions);
            println!("  Training data:        {}", stats.training_data);
            println!("  Pending verification: {}", stats.pending_verification);
            println!("  Users:                {}", stats.users);
            println!("  Active model:         {}", stats.active_model);
        }
        View::TrainingData => list_training(ctx)?,
        View::Models => print_models(&ctx.services.model_versions()?),
        View::Users => print_users(&ctx.services.list_users()?),
        View::Upload => {
            println!("Upload a spreadsheet with /upload <file.xlsx>, or add a single");
            println!("case with /training add <file> extraction|non-extraction.");
        }
    }
    Ok(())
}

/// Blanks out what is typed at a password prompt
struct MaskedInput;

impl Completer for MaskedInput {
    type Candidate = String;
}

impl Hinter for MaskedInput {
    type Hint = String;
}

impl Validator for MaskedInput {}

impl Helper for MaskedInput {}

impl Highlighter for MaskedInput {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Owned(" ".repeat(line.chars().count()))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, kind: CmdKind) -> bool {
        kind != CmdKind::MoveCursor
    }
}

fn read_password(label: &str) -> Result<String> {
    let mut rl: Editor<MaskedInput, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(MaskedInput));
    rl.set_color_mode(ColorMode::Forced);
    rl.set_auto_add_history(false);
    let mut cursor = rl.set_cursor_visibility(false)?;
    let line = rl.readline(label);
    cursor.take();
    Ok(line?)
}

fn login(ctx: &Context, args: &[&str]) -> Result<()> {
    let Some(username) = args.first() else {
        bail!("Usage: /login <username> [password]");
    };
    let password = match args.get(1) {
        Some(p) => p.to_string(),
        None => read_password("Password: ")?,
    };

    ctx.navigator.navigate(View::Login.path());
    match ctx.session.login(username, &password) {
        Ok(user) => {
            ctx.log(|t| t.login_ok(&user.username, user.is_admin));
            let role = if user.is_admin { "admin" } else { "user" };
            println!("Logged in as {} ({})", user.username, role);
            ctx.navigator.navigate(View::Dashboard.path());
            Ok(())
        }
        Err(e) => {
            ctx.log(|t| t.login_failed(username, &e));
            Err(e.into())
        }
    }
}

fn whoami(ctx: &Context) {
    let snapshot = ctx.session.current_snapshot();
    println!("Status: {}", snapshot.status.as_str());
    match &snapshot.user {
        Some(user) => {
            print_user(user);
            println!("Role: {}", if ctx.session.is_admin() { "admin" } else { "user" });
        }
        None if snapshot.loading() => println!("Checking saved login..."),
        None => println!("Not logged in"),
    }
    if let Some(err) = &snapshot.last_error {
        println!("Last error: {}", err);
    }
}

fn print_fields(group: Option<&str>) -> Result<()> {
    let groups: Vec<&measurements::Group> = match group {
        Some(id) => match measurements::group(id) {
            Some(g) => vec![g],
            None => bail!("Unknown group: {} (see /fields)", id),
        },
        None => measurements::GROUPS.iter().collect(),
    };
    for group in groups {
        println!("{} [{}]:", group.title, group.id);
        for field in group.fields {
            println!("  {}", field);
        }
    }
    Ok(())
}

fn print_pages(ctx: &Context) {
    let snapshot = ctx.session.current_snapshot();
    println!("Current page: {}", ctx.navigator.current().path());
    for view in View::all() {
        let open = matches!(crate::router::gate(&snapshot, view), Outcome::Render(_));
        println!(
            "  {:<22} {}{}",
            view.path(),
            view.title(),
            if open { "" } else { " (locked)" }
        );
    }
}

fn prediction_detail(ctx: &Context, id: i64) -> Result<()> {
    enter(ctx, View::History)?;
    let record = dashboard::find_prediction(&ctx.services, id)?;
    println!("Prediction #{}", record.id);
    println!("  Result:     {}", outcome_label(record.extraction_required));
    println!(
        "  Confidence: {:.1}% ({}) {}",
        record.confidence,
        confidence_label(record.confidence),
        confidence_bar(record.confidence)
    );
    if let Some(raw) = record.raw_prediction {
        println!("  Raw:        {:.4}", raw);
    }
    println!("  Created:    {}", format_timestamp(record.created_at.as_deref()));
    if !record.explanation.is_empty() {
        println!("Explanation:");
        for reason in &record.explanation {
            println!("  - {}", reason);
        }
    }
    let rows = dashboard::input_rows(&record.input_data);
    if !rows.is_empty() {
        println!("Input parameters:");
        for (name, value) in rows {
            println!("  {:<52} {}", name, value);
        }
    }
    Ok(())
}

fn raw_pairs(raw: &std::collections::BTreeMap<String, String>) -> Vec<(&str, &str)> {
    raw.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

fn predict(ctx: &Context, args: &[&str]) -> Result<()> {
    enter(ctx, View::Predict)?;
    let Some(file) = args.first() else {
        bail!("Usage: /predict <file.toml|file.json>");
    };
    let raw = measurements::load_file(Path::new(file))?;
    let cleaned = measurements::clean_prediction(raw_pairs(&raw))?;
    let result = ctx.services.predict(&cleaned)?;
    print_prediction(&result);
    Ok(())
}

fn profile(ctx: &Context, args: &[&str]) -> Result<()> {
    enter(ctx, View::Profile)?;
    match args {
        [] => whoami(ctx),
        ["email", email] => {
            let form = ProfileForm {
                email: email.to_string(),
                ..ProfileForm::default()
            };
            let update = form.validate()?;
            ctx.services.update_profile(&update)?;
            println!("Profile updated successfully");
            ctx.session.refresh()?;
        }
        _ => bail!("Usage: /profile [email <address>]"),
    }
    Ok(())
}

fn change_password(ctx: &Context) -> Result<()> {
    enter(ctx, View::Profile)?;
    let email = ctx
        .session
        .current_snapshot()
        .user
        .map(|u| u.email)
        .unwrap_or_default();

    let form = ProfileForm {
        email,
        current_password: read_password("Current password: ")?,
        new_password: read_password("New password: ")?,
        confirm_password: read_password("Confirm new password: ")?,
    };
    if form.new_password.is_empty() {
        bail!("New password is required");
    }
    let update = form.validate()?;
    ctx.services.update_profile(&update)?;
    println!("Password changed");
    ctx.session.refresh()?;
    Ok(())
}

fn parse_id(s: &str) -> Result<i64> {
    s.parse()
        .with_context(|| format!("Invalid id: {}", s))
}

fn parse_switch(s: &str) -> Result<bool> {
    match s {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => bail!("Expected on or off, got {}", s),
    }
}

fn user_command(ctx: &Context, args: &[&str]) -> Result<()> {
    enter(ctx, View::Users)?;
    match args {
        ["add", rest @ ..] => {
            let positional: Vec<&str> = rest.iter().copied().filter(|a| !a.starts_with("--")).collect();
            let [username, email, password] = positional[..] else {
                bail!("Usage: /user add <username> <email> <password> [--admin] [--inactive]");
            };
            let user = NewUser {
                username: username.trim().to_string(),
                email: email.trim().to_string(),
                password: password.to_string(),
                is_admin: rest.contains(&"--admin"),
                is_active: !rest.contains(&"--inactive"),
            };
            let created = ctx.services.create_user(&user)?;
            println!("User created successfully (id {})", created.id);
        }
        ["admin", id, switch] => {
            ctx.services.set_admin(parse_id(id)?, parse_switch(switch)?)?;
            println!("User updated successfully");
        }
        ["active", id, switch] => {
            ctx.services.set_active(parse_id(id)?, parse_switch(switch)?)?;
            println!("User updated successfully");
        }
        ["deactivate" | "delete", id] => {
            ctx.services.deactivate_user(parse_id(id)?)?;
            println!("User deactivated");
        }
        _ => bail!("Usage: /user add|admin|active|deactivate ... (see /help)"),
    }
    print_users(&ctx.services.list_users()?);
    Ok(())
}

fn training_command(ctx: &Context, args: &[&str]) -> Result<()> {
    enter(ctx, View::TrainingData)?;
    match args {
        [] => {}
        [action @ ("verify" | "reject"), id] => {
            let verified = *action == "verify";
            ctx.services.verify_training(parse_id(id)?, verified)?;
            println!(
                "Training data {} successfully",
                if verified { "verified" } else { "rejected" }
            );
        }
        ["add", file, outcome] => {
            let actual_outcome = match outcome.to_lowercase().as_str() {
                "extraction" => true,
                "non-extraction" | "nonextraction" => false,
                other => bail!("Outcome must be extraction or non-extraction, got {}", other),
            };
            let raw = measurements::load_file(Path::new(file))?;
            let input_data = measurements::clean_manual(raw_pairs(&raw))?;
            ctx.services.add_manual_training(&ManualTrainingEntry {
                input_data,
                actual_outcome,
            })?;
            println!("Training data added successfully");
        }
        [filter, rest @ ..] if rest.len() <= 1 => {
            let page = match rest.first() {
                Some(p) => p
                    .parse::<usize>()
                    .ok()
                    .filter(|p| *p > 0)
                    .with_context(|| format!("Invalid page: {}", p))?,
                None => 1,
            };
            match (filter.parse::<VerificationFilter>(), filter.parse::<usize>()) {
                (Ok(f), _) => *ctx.training_view.borrow_mut() = (f, page),
                (Err(_), Ok(p)) if p > 0 && rest.is_empty() => ctx.training_view.borrow_mut().1 = p,
                _ => bail!("Usage: /training [all|verified|unverified] [page]"),
            }
        }
        _ => bail!("Usage: /training [all|verified|unverified] [page] (see /help)"),
    }
    list_training(ctx)
}

fn list_training(ctx: &Context) -> Result<()> {
    let (filter, page) = *ctx.training_view.borrow();
    let size = ctx.config.training_page_size();
    let entries = ctx.services.training_data(filter, (page - 1) * size, size)?;
    println!("Training data ({}, page {}):", filter.as_str(), page);
    print_training(&entries);
    if entries.len() == size {
        println!("More entries: /training {} {}", filter.as_str(), page + 1);
    }
    Ok(())
}

fn upload(ctx: &Context, args: &[&str]) -> Result<()> {
    enter(ctx, View::Upload)?;
    let Some(file) = args.first() else {
        bail!("Usage: /upload <file.xlsx>");
    };
    let summary = ctx.services.upload_excel(Path::new(file))?;
    println!("File uploaded successfully");
    if !summary.is_null() {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn models_command(ctx: &Context, args: &[&str]) -> Result<()> {
    enter(ctx, View::Models)?;
    match args {
        [] => {}
        ["activate", id] => {
            let id = parse_id(id)?;
            let versions = ctx.services.model_versions()?;
            match versions.iter().find(|v| v.id == id) {
                None => bail!("No model version with id {}", id),
                Some(v) if v.is_active => bail!("Model {} is already active", v.version),
                Some(_) => {}
            }
            ctx.services.activate_model(id)?;
            println!("Model activated successfully");
        }
        ["train", description @ ..] => {
            ctx.services.train_model(&description.join(" "))?;
            println!("Model training started. This may take a few minutes.");
        }
        _ => bail!("Usage: /models [activate <id> | train <description>]"),
    }
    print_models(&ctx.services.model_versions()?);
    Ok(())
}

fn print_user(user: &User) {
    println!(
        "  #{} {} <{}> role: {} status: {}",
        user.id,
        user.username,
        user.email,
        if user.is_admin { "Admin" } else { "User" },
        if user.is_active { "Active" } else { "Inactive" }
    );
}

fn print_users(users: &[User]) {
    if users.is_empty() {
        println!("  No users found");
    }
    for user in users {
        print_user(user);
    }
}

fn confidence_bar(confidence: f64) -> String {
    let filled = ((confidence.clamp(0.0, 100.0) / 5.0).round()) as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(20 - filled))
}

fn print_prediction(result: &PredictionResult) {
    println!("Treatment recommendation: {}", outcome_label(result.extraction_required));
    println!(
        "  {} confidence ({:.1}%) {}",
        confidence_label(result.confidence),
        result.confidence,
        confidence_bar(result.confidence)
    );
    for reason in &result.explanation {
        println!("  - {}", reason);
    }
    println!("  Raw prediction: {:.4}", result.raw_prediction);
}

fn print_history(records: &[PredictionRecord]) {
    if records.is_empty() {
        println!("  No predictions yet");
    }
    for record in records {
        println!(
            "  #{} {} {} - {} confidence ({:.1}%)",
            record.id,
            format_timestamp(record.created_at.as_deref()),
            outcome_label(record.extraction_required),
            confidence_label(record.confidence),
            record.confidence
        );
    }
}

fn print_training(entries: &[TrainingEntry]) {
    if entries.is_empty() {
        println!("  No training data found");
    }
    for entry in entries {
        println!(
            "  #{} {} {} {} ({} fields) by {}",
            entry.id,
            format_timestamp(entry.created_at.as_deref()),
            outcome_label(entry.actual_outcome),
            if entry.verified { "verified" } else { "pending" },
            entry.input_data.len(),
            submitter(entry)
        );
    }
}

fn submitter(entry: &TrainingEntry) -> String {
    match &entry.submitted_by {
        None | Some(serde_json::Value::Null) => "unknown".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn print_models(versions: &[ModelVersion]) {
    if versions.is_empty() {
        println!("  No model versions found");
    }
    for version in versions {
        println!(
            "  #{} {}{} accuracy: {} created: {} {}",
            version.id,
            version.version,
            if version.is_active { " [active]" } else { "" },
            format_accuracy(version.accuracy),
            format_timestamp(version.created_at.as_deref()),
            version.description.as_deref().unwrap_or("")
        );
    }
}
