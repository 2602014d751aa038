// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kasmos - orchestrator for concurrent coding-agent sessions

mod context;
mod rehydrate;
mod view;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use futures_util::StreamExt;
use ratatui::backend::CrosstermBackend;
use serde::Deserialize;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use kasmos_adapters::session::TmuxAdapter;
use kasmos_adapters::TracedSession;
use kasmos_app::{AppModel, Cmd, Config, Message, Reducer, NAMESPACE_PREFIX};
use kasmos_core::{Instance, InstanceOpts};
use kasmos_engine::{GitWorktreeManager, NoopRemoteStore};
use kasmos_storage::{AppState, AuditSink, FileAuditSink, PermissionCache};

use context::Ctx;

const RENDER_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "kasmos", version, about = "orchestrator for concurrent coding-agent sessions")]
struct Args {
    /// Repository to operate on (defaults to the enclosing git repo of the
    /// current directory).
    #[arg(short = 'C', long = "repo", value_name = "DIR")]
    repo: Option<PathBuf>,
    /// Agent CLI command line spawned in each pane.
    #[arg(long)]
    program: Option<String>,
    /// Globally pre-accept permission prompts.
    #[arg(long)]
    auto_yes: bool,
    /// Skip the wave-complete confirmation dialog when a wave had zero
    /// failures.
    #[arg(long)]
    auto_advance: bool,
}

/// `~/.config/kasmos/config.toml` — every field optional, layered over
/// [`Config::default`] and then overridden by CLI flags.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    program: Option<String>,
    auto_yes: Option<bool>,
    auto_advance: Option<bool>,
    global_instance_limit: Option<usize>,
    base_branch: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", format_error(&err));
        std::process::exit(1);
    }
}

/// Deduplicate an anyhow chain whose top-level message already restates its
/// source (thiserror's `#[from]` variants do this), matching the teacher's
/// error-formatting convention.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();
    let chain_redundant = err.chain().skip(1).all(|cause| top.contains(&cause.to_string()));
    if chain_redundant {
        return top;
    }
    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {i}: {cause}"));
    }
    buf
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let repo_root = find_repo_root(args.repo.clone())?;
    let kasmos_dir = repo_root.join(".kasmos");
    std::fs::create_dir_all(&kasmos_dir).context("creating .kasmos directory")?;

    let _log_guard = init_tracing(&kasmos_dir)?;
    tracing::info!(repo = %repo_root.display(), "starting kasmos");

    let config = load_config(&args)?;
    let plans_dir = repo_root.join("docs").join("plans");

    let permission_cache = PermissionCache::load(&kasmos_dir).context("loading permission cache")?;
    let app_state_path = kasmos_storage::default_app_state_path();
    let app_state = match app_state_path.as_deref() {
        Some(path) => AppState::load(path).context("loading app state")?,
        None => AppState::default(),
    };
    let audit: Arc<dyn AuditSink> = Arc::new(FileAuditSink::new(kasmos_dir.join("audit.jsonl")));

    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let ctx = Ctx {
        repo_root: repo_root.clone(),
        plans_dir: plans_dir.clone(),
        program: config.program.clone(),
        base_branch: config.base_branch.clone(),
        namespace_prefix: NAMESPACE_PREFIX.to_string(),
        env: Vec::new(),
        tx,
        sessions: Arc::new(AsyncMutex::new(HashMap::new())),
        pending_terminals: Arc::new(parking_lot::Mutex::new(HashMap::new())),
        remote: Arc::new(NoopRemoteStore),
        audit: audit.clone(),
        app_state_path,
        adapter: TracedSession::new(TmuxAdapter::new()),
        worktree: GitWorktreeManager::default(),
    };

    let mut model = AppModel::new(config, repo_root, plans_dir, permission_cache, app_state, audit);
    rehydrate::rehydrate(&ctx, &mut model).await;
    let reducer = Reducer::new(model);

    context::run_metadata_tick(ctx.clone());

    run_ui(ctx, rx, reducer).await
}

/// Walk up from `start` (or the current directory) looking for a `.git`
/// entry; falls back to the starting directory if none is found, so a
/// bare directory still works for a first-time `docs/plans` layout.
fn find_repo_root(start: Option<PathBuf>) -> Result<PathBuf> {
    let start = match start {
        Some(path) => path,
        None => std::env::current_dir().context("reading current directory")?,
    };
    let start = start
        .canonicalize()
        .with_context(|| format!("resolving {}", start.display()))?;
    let mut dir = start.as_path();
    loop {
        if dir.join(".git").exists() {
            return Ok(dir.to_path_buf());
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => return Ok(start),
        }
    }
}

fn init_tracing(kasmos_dir: &Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let logs_dir = kasmos_dir.join("logs");
    std::fs::create_dir_all(&logs_dir).context("creating logs directory")?;
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "kasmos.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::default();

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("kasmos").join("config.toml");
        if let Ok(text) = std::fs::read_to_string(&path) {
            let file: ConfigFile = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
            if let Some(program) = file.program {
                config.program = program;
            }
            if let Some(auto_yes) = file.auto_yes {
                config.auto_yes = auto_yes;
            }
            if let Some(auto_advance) = file.auto_advance {
                config.auto_advance = auto_advance;
            }
            if let Some(limit) = file.global_instance_limit {
                config.global_instance_limit = limit;
            }
            if let Some(base_branch) = file.base_branch {
                config.base_branch = base_branch;
            }
        }
    }

    if let Some(program) = &args.program {
        config.program = program.clone();
    }
    if args.auto_yes {
        config.auto_yes = true;
    }
    if args.auto_advance {
        config.auto_advance = true;
    }

    Ok(config)
}

/// Raw-mode/alternate-screen setup, torn down on drop so a panic or an
/// early return still restores the operator's terminal.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("enabling raw mode")?;
        execute!(std::io::stdout(), EnterAlternateScreen).context("entering alternate screen")?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

async fn run_ui(ctx: Ctx, mut rx: mpsc::UnboundedReceiver<Message>, mut reducer: Reducer) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut terminal = ratatui::Terminal::new(backend).context("constructing terminal backend")?;
    terminal.clear().context("clearing terminal")?;

    let mut events = EventStream::new();
    let mut poll = tokio::time::interval(RENDER_POLL_INTERVAL);
    let mut current_terminal: Option<context::Terminal> = None;

    let size = terminal.size().context("reading terminal size")?;
    apply_update(&ctx, &mut reducer, &mut current_terminal, Message::Resize { cols: size.width, rows: size.height }).await;

    while !reducer.model().should_quit {
        terminal
            .draw(|frame| view::render(frame, reducer.model(), current_terminal.as_mut()))
            .context("drawing frame")?;

        tokio::select! {
            maybe_event = events.next() => {
                let Some(Ok(event)) = maybe_event else { continue };
                if let Some(msg) = translate_event(event) {
                    apply_update(&ctx, &mut reducer, &mut current_terminal, msg).await;
                }
            }
            Some(msg) = rx.recv() => {
                apply_update(&ctx, &mut reducer, &mut current_terminal, msg).await;
            }
            _ = poll.tick() => {
                if let Some(terminal_handle) = current_terminal.as_mut() {
                    let _ = terminal_handle.wait_for_render(Duration::ZERO).await;
                }
            }
        }
    }

    let model = reducer.into_model();
    context::save_user_state(ctx, model.app_state);
    Ok(())
}

fn translate_event(event: Event) -> Option<Message> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(Message::Key(key)),
        Event::Key(_) => None,
        Event::Mouse(mouse) => Some(Message::Mouse(mouse)),
        Event::Resize(cols, rows) => Some(Message::Resize { cols, rows }),
        _ => None,
    }
}

/// Run one `Message` through the reducer, adopt a newly-ready terminal (or
/// drop the current one) per the stale-attach invariant, then dispatch the
/// resulting `Cmd`s as worker tasks.
async fn apply_update(ctx: &Ctx, reducer: &mut Reducer, current_terminal: &mut Option<context::Terminal>, msg: Message) {
    let cmds = reducer.update(msg);
    sync_terminal(ctx, reducer.model(), current_terminal);
    for cmd in cmds {
        execute_cmd(ctx, reducer.model(), current_terminal, cmd).await;
    }
}

/// Adopt the terminal matching the model's current generation out of
/// `ctx.pending_terminals`, if one has arrived, and drop `current` if the
/// model no longer has anything attached (selection changed, or the
/// attached instance was killed). Any other pending entry is stale — a
/// selection made and abandoned before its spawn completed — and is
/// discarded here rather than leaked.
fn sync_terminal(ctx: &Ctx, model: &AppModel, current: &mut Option<context::Terminal>) {
    if model.terminal_instance.is_none() {
        *current = None;
    }
    let mut pending = ctx.pending_terminals.lock();
    if let Some(terminal) = pending.remove(&model.terminal_generation) {
        *current = Some(terminal);
    }
    pending.retain(|generation, _| *generation == model.terminal_generation);
}

async fn execute_cmd(ctx: &Ctx, model: &AppModel, current_terminal: &mut Option<context::Terminal>, cmd: Cmd) {
    match cmd {
        Cmd::SpawnOnMain { instance } => {
            if let Some(inst) = model.sessions.get(&instance) {
                context::spawn_on_main(ctx.clone(), instance, instance_opts(inst));
            }
        }
        Cmd::SpawnOnBranch { instance, branch } => {
            if let Some(inst) = model.sessions.get(&instance) {
                context::spawn_on_branch(ctx.clone(), instance, branch, instance_opts(inst));
            }
        }
        Cmd::SpawnWaveTasks { plan_file } => {
            let Some((wave_number, branch, display_name)) = wave_spawn_args(model, &plan_file) else { return };
            context::spawn_wave(ctx.clone(), plan_file, wave_number, branch, display_name);
        }
        Cmd::RespawnWaveTasks { plan_file, task_numbers } => {
            let Some((wave_number, branch, display_name)) = wave_spawn_args(model, &plan_file) else { return };
            let Some(worktree_path) = model
                .wave_orchestrators
                .get(&plan_file)
                .and_then(|orch| orch.worktree_path())
                .map(Path::to_path_buf)
            else {
                return;
            };
            context::respawn_wave(ctx.clone(), plan_file, wave_number, branch, display_name, worktree_path, task_numbers);
        }
        Cmd::Pause { instance } => context::pause(ctx.clone(), instance),
        Cmd::Resume { instance } => context::resume(ctx.clone(), instance),
        Cmd::Kill { instance, shared } => context::kill(ctx.clone(), instance, shared),
        Cmd::DeliverPrompt { instance, text } => context::deliver_prompt(ctx.clone(), instance, text),
        Cmd::TapEnter { instance } => context::tap_enter(ctx.clone(), instance),
        Cmd::SendKey { instance, bytes } => context::send_key(ctx.clone(), instance, bytes),
        Cmd::ResizeSession { instance, cols, rows } => context::resize_session(ctx.clone(), instance, cols, rows),
        Cmd::PushBranch { instance } => context::push_branch(ctx.clone(), instance),
        Cmd::SpawnTerminal { instance, generation, cols, rows } => {
            context::spawn_terminal(ctx.clone(), instance, generation, cols, rows)
        }
        // The one live `EmbeddedTerminal` lives in `current_terminal`, owned
        // by the event loop, not in `Ctx` — this resizes it directly instead
        // of going through a worker task.
        Cmd::ResizeTerminal { cols, rows } => {
            if let Some(terminal) = current_terminal.as_mut() {
                if let Err(err) = terminal.resize(cols, rows).await {
                    tracing::warn!(%err, "failed to resize attached terminal");
                }
            }
        }
        Cmd::RunMetadataTick => context::run_metadata_tick(ctx.clone()),
        Cmd::ImportTasks => context::import_tasks(ctx.clone()),
        Cmd::SendPermissionResponse { instance, pattern, allow, always } => {
            context::send_permission_response(ctx.clone(), instance, pattern, allow, always)
        }
        Cmd::RenderMarkdown { plan_file, markdown } => context::render_markdown(ctx.clone(), plan_file, markdown),
        Cmd::SaveUserState => context::save_user_state(ctx.clone(), model.app_state.clone()),
        Cmd::RecordAudit(entry) => context::record_audit(ctx.clone(), entry),
        Cmd::MirrorPlanState { file, entry } => context::mirror_plan_state(ctx.clone(), file, entry),
    }
}

/// `(wave_number, branch, display_name)` for a wave-spawn `Cmd` — read
/// synchronously out of the model the reducer already owns, since neither
/// the orchestrator's state machine nor the plan-state document cross into
/// a worker task.
fn wave_spawn_args(model: &AppModel, plan_file: &str) -> Option<(u32, String, String)> {
    let wave_number = model.wave_orchestrators.get(plan_file)?.current_wave_number();
    let branch = model.plan_state.as_ref()?.entry(plan_file)?.branch.clone();
    let display_name = kasmos_core::display_name(plan_file);
    Some((wave_number, branch, display_name))
}

fn instance_opts(instance: &Instance) -> InstanceOpts {
    InstanceOpts {
        title: instance.title.clone(),
        program: instance.program.clone(),
        path: instance.path.clone(),
        agent_type: instance.agent_type,
        plan_file: instance.plan_file.clone(),
        wave_number: instance.wave_number,
        task_number: instance.task_number,
        solo_agent: instance.solo_agent,
    }
}
