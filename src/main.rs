use clap::Parser;
use rebase_panel::cli::args::{Args, Command, RebaseCommand};
use rebase_panel::config::Config;
use rebase_panel::editor::{BufferEditor, DiffEditor};
use rebase_panel::history::{DiffComparison, HistoryController, PageLoad, RangeSelector};
use rebase_panel::infrastructure::{setup_logging, LoggingConfig};
use rebase_panel::rebase::{RebasePhase, RebaseSession, RebaseState, RebaseTransition};
use rebase_panel::rpc::{Backend, HttpRpcInvoker};
use rebase_panel::updates::BatchedUpdateCoordinator;
use std::path::Path;
use std::sync::Arc;

async fn handle_log(
    backend: Arc<Backend>,
    config: &Config,
    updates: BatchedUpdateCoordinator,
    pages: usize,
) -> anyhow::Result<()> {
    let mut history = HistoryController::new(backend)
        .with_branch(config.branch.clone())
        .with_updates(updates);

    let mut outcome = history.load_first_page(config.page_size).await;
    for _ in 1..pages {
        if outcome == PageLoad::Failed || !history.has_more() {
            break;
        }
        outcome = history.load_next_page().await;
    }

    if let Some(error) = history.error() {
        anyhow::bail!("Failed to load history: {}", error);
    }
    if history.commits().is_empty() {
        println!("No commits found");
        return Ok(());
    }

    let range = history.range();
    for commit in history.commits() {
        let marker = match (range.to(), range.from()) {
            (Some(to), _) if to == commit.hash => "to  ",
            (_, Some(from)) if from == commit.hash => "from",
            _ => "    ",
        };
        let branch = commit
            .branch
            .as_deref()
            .map(|b| format!(" ({})", b))
            .unwrap_or_default();
        println!(
            "{} {} {:<20} {}{}",
            marker,
            commit.short_hash(),
            commit.author,
            commit.summary(),
            branch
        );
    }
    if history.has_more() {
        println!("... more commits available (use --pages)");
    }
    Ok(())
}

async fn handle_diff(
    backend: Arc<Backend>,
    editor: Arc<BufferEditor>,
    from: &str,
    to: &str,
    file: Option<&str>,
) -> anyhow::Result<()> {
    let mut range = RangeSelector::new();
    range.select_to(&[], to);
    range.select_from(&[], from);

    let comparison = DiffComparison::new(backend, editor.clone());
    match file {
        None => {
            let files = comparison.changed_files(&range).await?;
            if files.is_empty() {
                println!("No changes between {} and {}", from, to);
            }
            for file in files {
                println!("  {}", file);
            }
        }
        Some(path) => {
            let diff = comparison.open_file(&range, path).await?;
            if diff.is_unchanged() {
                println!("{} is identical in both commits", path);
                return Ok(());
            }
            println!("--- {} @ {}", diff.path, diff.from_version);
            println!("{}", editor.original_content());
            println!("+++ {} @ {}", diff.path, diff.to_version);
            println!("{}", editor.current_content());
        }
    }
    Ok(())
}

fn print_state(state: &RebaseState) {
    println!("Phase: {}", state.phase);
    if !state.plan.is_empty() {
        println!("Plan:");
        for (index, step) in state.plan.steps().iter().enumerate() {
            println!(
                "  {:>2}. {:<6} {} {}",
                index, step.action, step.short_hash(), step.message
            );
        }
    }
    if !state.conflicts.is_empty() {
        println!("Conflicts:");
        for file in state.conflicts.files() {
            let marker = if state.conflicts.active() == Some(file) { "*" } else { " " };
            println!("  {} {}", marker, file);
        }
    }
    if let Some(request) = &state.editor_request {
        println!("Waiting for editor file: {} ({})", request.file, request.kind);
        if !request.description.is_empty() {
            println!("  {}", request.description);
        }
        if !request.instructions.is_empty() {
            println!("  {}", request.instructions);
        }
        println!("{}", request.content);
    }
    if let Some(raw) = &state.raw_status {
        println!("{}", raw.trim_end());
    }
    if let Some(error) = &state.last_error {
        println!("❌ {}", error);
    }
}

fn load_editor_content(editor: &BufferEditor, path: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = path {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        editor.set_current(content);
    }
    Ok(())
}

async fn handle_rebase(
    session: &RebaseSession,
    editor: &BufferEditor,
    command: &RebaseCommand,
) -> anyhow::Result<()> {
    // 先同步后端当前的 rebase 状态
    if session.poll().await.is_none() {
        if let Some(error) = session.last_error() {
            tracing::warn!("Could not read rebase status: {}", error);
        }
    }

    let transition = match command {
        RebaseCommand::Start { from, to } => {
            session
                .start(Some(from.as_str()), Some(to.as_str()))
                .await
        }
        RebaseCommand::Run { from, to, set } => {
            let planned = session.start(Some(from.as_str()), Some(to.as_str())).await;
            if planned != RebaseTransition::Planned {
                planned
            } else {
                for (index, action) in set {
                    session.set_step_action(*index, *action)?;
                }
                tracing::debug!("Todo:\n{}", session.snapshot().plan.to_todo_text());
                session.execute().await
            }
        }
        RebaseCommand::Continue => session.continue_rebase().await,
        RebaseCommand::Abort => session.abort().await,
        RebaseCommand::Resolve {
            resolution,
            content_file,
        } => {
            load_editor_content(editor, content_file.as_deref())?;
            session.resolve(*resolution).await
        }
        RebaseCommand::Editor { content_file } => {
            load_editor_content(editor, content_file.as_deref())?;
            session.save_git_editor_file().await
        }
        RebaseCommand::Commit { message } => session.commit_staged(message.as_deref()).await,
        RebaseCommand::Amend => session.amend_commit().await,
    };

    let state = session.snapshot();
    if transition.is_failure() {
        print_state(&state);
        anyhow::bail!("{}", transition);
    }
    println!("✓ {}", transition);
    print_state(&state);
    if state.phase == RebasePhase::Conflicted {
        println!("Resolve with: rebase-panel rebase resolve <ours|theirs|manual>");
    }
    Ok(())
}

// 批量更新依赖单线程调度
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::new();

    config.update_from_args(&args)?;
    config.validate()?;
    setup_logging(LoggingConfig::from_level(&config.log_level, config.debug))?;

    let invoker = Arc::new(HttpRpcInvoker::new(
        &config.backend_url,
        config.request_timeout(),
    )?);
    let backend = Arc::new(Backend::connect(invoker).await?);
    let missing = backend.methods().missing();
    if config.debug && !missing.is_empty() {
        println!("Backend does not provide: {:?}", missing);
    }

    let (updates, mut batches) = BatchedUpdateCoordinator::new();
    tokio::spawn(async move {
        while let Some(batch) = batches.recv().await {
            tracing::debug!("Panel fields updated: {:?}", batch.keys().collect::<Vec<_>>());
        }
    });

    let editor = Arc::new(BufferEditor::new());
    let panel_editor: Arc<dyn DiffEditor> = editor.clone();
    match &args.command {
        Command::Log { pages } => handle_log(backend, &config, updates, *pages).await,
        Command::Diff { from, to, file } => {
            handle_diff(backend, editor, from, to, file.as_deref()).await
        }
        Command::Status => {
            let session = RebaseSession::new(backend, panel_editor, updates);
            match session.poll().await {
                Some(kind) => println!("Rebase: {}", kind),
                None => println!("❌ Rebase status unavailable"),
            }
            print_state(&session.snapshot());
            if let Some(status) = session.snapshot().git_status {
                if let Some(branch) = status.branch {
                    println!("Branch: {}", branch);
                }
                println!(
                    "Modified: {}  Staged: {}  Untracked: {}",
                    status.modified_files.len(),
                    status.staged_files.len(),
                    status.untracked_files.len()
                );
            }
            Ok(())
        }
        Command::Rebase(command) => {
            let session = RebaseSession::new(backend, panel_editor, updates);
            handle_rebase(&session, &editor, command).await
        }
    }
}
