use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use teacher_panel::api::{
    Assignment, Group, JoinRequest, NewAssignment, Submission, Teacher, TeacherApi, UploadFile,
    UploadOptions, UploadProgress,
};
use teacher_panel::cli::{Cli, Command, Tab};
use teacher_panel::clipboard::ClipboardHandler;
use teacher_panel::config::Config;
use teacher_panel::guard::{guard, login_redirect_target, RouteDecision};
use teacher_panel::logging::init_tracing;
use teacher_panel::poller::{callback, Foreground, VisibilityFlag};
use teacher_panel::session::Session;
use teacher_panel::views::assignments::validate_draft;
use teacher_panel::views::{
    AssignmentDraft, AssignmentsView, DashboardView, Decision, GroupDetailView, GroupsView,
    Settled,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(base) = &cli.base_url {
        config.api.base_url = base.clone();
        config.validate()?;
    }

    let api = TeacherApi::from_config(&config)?;
    let session = Session::new(api.clone());

    match cli.command.route() {
        Some(route) => ensure_session(&session, &cli, &route).await?,
        None => {
            session.refresh().await;
            let teacher = sign_in(&session, &cli).await?;
            println!("Signed in as {} ({})", teacher.name, teacher.login);
            return Ok(());
        }
    }

    dispatch(cli.command, &config, &session, api).await
}

/// Run the route guard for `route`, signing in when it asks for a login.
async fn ensure_session(session: &Session, cli: &Cli, route: &str) -> Result<()> {
    session.refresh().await;
    let snapshot = session.ready().await;

    match guard(&snapshot, route) {
        RouteDecision::Allow => Ok(()),
        RouteDecision::Loading => bail!("Session check did not finish"),
        RouteDecision::Redirect { from, .. } => {
            sign_in(session, cli).await?;
            debug!(next = login_redirect_target(Some(from.as_str())), "Continuing after login");
            Ok(())
        }
    }
}

async fn sign_in(session: &Session, cli: &Cli) -> Result<Teacher> {
    let (Some(login), Some(password)) = (&cli.login, &cli.password) else {
        bail!("Not signed in. Pass --login and --password (or TEACHER_LOGIN / TEACHER_PASSWORD)");
    };
    Ok(session.login(login, password).await?)
}

fn check(err: &Option<String>) -> Result<()> {
    match err {
        Some(message) => bail!("{}", message),
        None => Ok(()),
    }
}

fn print_notice(notice: &mut Option<String>) {
    if let Some(text) = notice.take() {
        println!("{}", text);
    }
}

/// Cancellation token fired by Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            child.cancel();
        }
    });
    token
}

fn upload_options() -> UploadOptions {
    UploadOptions::default()
        .cancel(ctrl_c_token())
        .on_progress(|p: UploadProgress| {
            match p.percent {
                Some(pct) => eprint!("\rUploading... {:>3}%", pct),
                None => eprint!("\rUploading... {} bytes", p.loaded),
            }
            let _ = std::io::stderr().flush();
        })
}

async fn dispatch(command: Command, config: &Config, session: &Session, api: TeacherApi) -> Result<()> {
    match command {
        Command::Login => {}
        Command::Logout => {
            session.logout().await?;
            println!("Signed out");
        }
        Command::Me => {
            if let Some(t) = session.teacher() {
                println!("{} ({}) #{}", t.name, t.login, t.id);
            }
        }
        Command::Dashboard => {
            let mut view = DashboardView::new(api);
            view.load().await;
            check(&view.err)?;
            let stats = view.stats();
            println!("Groups:   {}", stats.total_groups);
            println!("Students: {}", stats.total_students);
            println!("Pending:  {}", stats.pending);
        }
        Command::Groups { filter } => {
            let mut view = GroupsView::new(api);
            view.load().await;
            check(&view.err)?;
            for group in view.filtered(filter.as_deref().unwrap_or("")) {
                print_group(group);
            }
        }
        Command::CreateGroup { name } => {
            let mut view = GroupsView::new(api);
            view.create(&name).await;
            check(&view.err)?;
            println!("Created '{}'", name.trim());
        }
        Command::Group { id, tab, copy_code } => {
            let mut view = GroupDetailView::new(api, id);
            view.load_all().await;
            check(&view.err)?;
            if tab != Tab::Pending {
                view.switch_tab(tab.into()).await;
                check(&view.err)?;
            }
            if let Some(group) = &view.group {
                print_group(group);
            }
            let counts = view.counts();
            println!("pending: {}  approved: {}", counts.pending, counts.approved);
            print_requests(&view.requests);

            if copy_code {
                if let Some(code) = view.join_code() {
                    let copied = ClipboardHandler::new()
                        .map_err(|e| anyhow::anyhow!("Clipboard unavailable: {}", e))?
                        .copy_join_code(code)
                        .map_err(anyhow::Error::msg)?;
                    if copied {
                        println!("Join code copied");
                    }
                }
            }
        }
        Command::RotateCode { group_id } => {
            let mut view = GroupDetailView::new(api, group_id);
            let code = view.rotate_code().await;
            check(&view.err)?;
            if let Some(code) = code {
                println!("New join code: {}", code);
            }
        }
        Command::Approve { group_id, student_id } => {
            adjudicate(api, group_id, student_id, Decision::Approve).await?
        }
        Command::Deny { group_id, student_id } => {
            adjudicate(api, group_id, student_id, Decision::Deny).await?
        }
        Command::Assignments { group_id } => {
            let mut view = AssignmentsView::new(api, group_id);
            view.load(false).await;
            check(&view.err)?;
            for a in &view.assignments {
                print_assignment(a);
            }
        }
        Command::Analyze { title, description } => {
            let mut view = AssignmentsView::new(api, 0);
            let analysis = view.analyze(&title, &description).await;
            check(&view.err)?;
            match analysis {
                Some(a) => println!("{}", serde_json::to_string_pretty(&a)?),
                None => println!("No analysis returned"),
            }
        }
        Command::CreateAssignment {
            group_id,
            title,
            description,
            file,
            two_step,
        } => {
            let file = match file {
                Some(path) => Some(UploadFile::from_path(&path).await?),
                None => None,
            };

            if two_step {
                if let Err(e) = validate_draft(&title, &description, file.is_some()) {
                    bail!("{}", e);
                }
                let analysis = api.analyze_assignment(title.trim(), description.trim()).await?;
                let body = NewAssignment {
                    group_id,
                    title: title.trim().to_string(),
                    description: description.trim().to_string(),
                    max_score: analysis.as_ref().and_then(|a| a.suggested_max_score),
                    ai_type: analysis.as_ref().and_then(|a| a.ai_type.clone()),
                    ai_summary: analysis.as_ref().and_then(|a| a.summary.clone()),
                    ai_rubric_json: analysis
                        .as_ref()
                        .filter(|a| !a.rubric.is_null())
                        .map(|a| a.rubric.to_string()),
                    ..NewAssignment::default()
                };
                let created = api.create_assignment_smart(body, file, upload_options()).await?;
                eprintln!();
                println!("Assignment created{}", created.assignment_id.map(|id| format!(" #{}", id)).unwrap_or_default());
            } else {
                let mut view = AssignmentsView::new(api, group_id);
                let draft = AssignmentDraft {
                    title,
                    description,
                    file,
                };
                let had_file = draft.file.is_some();
                view.create(draft, upload_options()).await;
                if had_file {
                    eprintln!();
                }
                check(&view.err)?;
                print_notice(&mut view.notice);
                if let Some(analysis) = &view.analysis {
                    println!("{}", serde_json::to_string_pretty(analysis)?);
                }
            }
        }
        Command::Upload { file } => {
            let upload = UploadFile::from_path(&file).await?;
            let meta = api.upload_assignment_file(upload, upload_options()).await;
            eprintln!();
            let meta = meta?;
            println!("Uploaded to {}", meta.attachment_path);
        }
        Command::DeleteAssignment { assignment_id } => {
            let mut view = AssignmentsView::new(api, 0);
            view.delete(assignment_id).await;
            check(&view.err)?;
            print_notice(&mut view.notice);
        }
        Command::Submissions { assignment_id } => {
            let mut view = AssignmentsView::new(api, 0);
            view.open_submissions(assignment_id).await;
            check(&view.err)?;
            print_submissions(&view.submissions);
        }
        Command::Grade {
            assignment_id,
            submission_id,
        } => {
            let mut view = AssignmentsView::new(api, 0);
            view.open_submissions(assignment_id).await;
            check(&view.err)?;
            view.grade(submission_id).await;
            check(&view.err)?;
            print_notice(&mut view.notice);
            print_submissions(&view.submissions);
        }
        Command::Override {
            assignment_id,
            submission_id,
            score,
            feedback,
        } => {
            let mut view = AssignmentsView::new(api, 0);
            view.open_submissions(assignment_id).await;
            check(&view.err)?;
            view.override_grade(submission_id, score, feedback.as_deref()).await;
            check(&view.err)?;
            print_notice(&mut view.notice);
            print_submissions(&view.submissions);
        }
        Command::Watch {
            group_id,
            assignment,
        } => watch(config, api, group_id, assignment).await?,
    }
    Ok(())
}

async fn adjudicate(api: TeacherApi, group_id: i64, student_id: i64, decision: Decision) -> Result<()> {
    let mut view = GroupDetailView::new(api, group_id);
    view.load_all().await;
    check(&view.err)?;

    let settled = match decision {
        Decision::Approve => view.approve(student_id).await,
        Decision::Deny => view.deny(student_id).await,
    };
    match settled {
        Some(Settled::Confirmed) => {
            let verb = match decision {
                Decision::Approve => "Approved",
                Decision::Deny => "Denied",
            };
            println!("{} student #{}", verb, student_id);
            print_requests(&view.requests);
            Ok(())
        }
        Some(Settled::RolledBack { error }) => bail!("{}", error),
        None => bail!("Another change is still in progress"),
    }
}

/// Poll join requests (and submissions) until Ctrl-C.
async fn watch(config: &Config, api: TeacherApi, group_id: i64, assignment: Option<i64>) -> Result<()> {
    let foreground: Arc<dyn Foreground> = Arc::new(VisibilityFlag::default());
    let run_on_focus = config.poll.run_on_focus;

    let detail = Arc::new(Mutex::new(GroupDetailView::new(api.clone(), group_id)));
    {
        let mut view = detail.lock().await;
        view.load_all().await;
        check(&view.err)?;
        print_requests(&view.requests);
    }

    let requests_poller = GroupDetailView::poller(
        Arc::clone(&detail),
        Duration::from_millis(config.poll.join_requests_interval_ms),
        Arc::clone(&foreground),
        run_on_focus,
    );
    let view = Arc::clone(&detail);
    requests_poller.set_callback(callback(move || {
        let view = Arc::clone(&view);
        async move {
            let mut view = view.lock().await;
            let before = view.requests.len();
            view.refresh_requests().await;
            if view.requests.len() != before {
                println!("Join requests: {}", view.requests.len());
                print_requests(&view.requests);
            }
        }
    }));
    requests_poller.start();

    let submissions_poller = match assignment {
        Some(assignment_id) => {
            let subs = Arc::new(Mutex::new(AssignmentsView::new(api, group_id)));
            {
                let mut view = subs.lock().await;
                view.open_submissions(assignment_id).await;
                check(&view.err)?;
                print_submissions(&view.submissions);
            }
            let poller = AssignmentsView::poller(
                subs,
                Duration::from_millis(config.poll.submissions_interval_ms),
                Arc::clone(&foreground),
                run_on_focus,
            );
            poller.start();
            Some(poller)
        }
        None => None,
    };

    println!("Watching group {} (Ctrl-C to stop)", group_id);
    tokio::signal::ctrl_c().await?;

    requests_poller.stop();
    if let Some(poller) = submissions_poller {
        poller.stop();
    }
    Ok(())
}

fn print_group(g: &Group) {
    println!(
        "#{:<5} {:<24} code {:<10} students {:<4} pending {}",
        g.id, g.name, g.code, g.students_count, g.pending_count
    );
}

fn print_requests(requests: &[JoinRequest]) {
    for r in requests {
        println!(
            "  student #{:<6} {:<24} {}",
            r.student_id,
            r.name,
            r.created_at.as_deref().unwrap_or("")
        );
    }
}

fn print_assignment(a: &Assignment) {
    println!(
        "#{:<5} {:<32} max {:<5} {}",
        a.id,
        a.title,
        a.max_score.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string()),
        a.ai_type.as_deref().unwrap_or("")
    );
}

fn print_submissions(subs: &[Submission]) {
    for s in subs {
        let score = s
            .effective_score()
            .map(|v| format!("{:.1}/{}", v, s.max()))
            .unwrap_or_else(|| "ungraded".to_string());
        println!("  #{:<6} {:<24} {}", s.id, s.student_name, score);
        if let Some(feedback) = s.teacher_feedback.as_deref().or(s.ai_feedback.as_deref()) {
            println!("          {}", feedback);
        }
    }
}
