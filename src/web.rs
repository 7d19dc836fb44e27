use actix_session::config::PersistentSession;
use actix_session::storage::CookieSessionStore;
use actix_session::{Session, SessionMiddleware};
use actix_web::cookie::{time::Duration as CookieDuration, Key};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{middleware, web, App, HttpResponse, HttpServer, Result};
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::EditorConfig;
use crate::display::conflict_report;
use crate::editor::TimetableEditor;
use crate::error::EditorError;
use crate::form::{export_filename, parse_submission, submission_rows, timetable_csv};
use crate::grid::{period_times, Command, SlotRef};
use crate::parser::PageInputs;

const EDITOR_KEY: &str = "editor_id";

/// An editor together with the last time a request touched it
pub struct OpenEditor {
    editor: TimetableEditor,
    last_used: Instant,
}

impl OpenEditor {
    fn new(editor: TimetableEditor) -> Self {
        Self {
            editor,
            last_used: Instant::now(),
        }
    }
}

/// Open editors, keyed by the id stored in each browser session
pub struct AppState {
    pub editors: Mutex<HashMap<String, OpenEditor>>,
    pub config: EditorConfig,
}

impl AppState {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            editors: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn editors(&self) -> Result<MutexGuard<'_, HashMap<String, OpenEditor>>> {
        self.editors
            .lock()
            .map_err(|_| actix_web::error::ErrorInternalServerError("editor state poisoned"))
    }

    fn idle_limit(&self) -> Duration {
        Duration::from_secs(self.config.editor_idle_minutes.saturating_mul(60))
    }
}

/// Drops editors whose sessions have gone quiet for longer than `limit`
fn evict_idle(editors: &mut HashMap<String, OpenEditor>, limit: Duration) {
    let before = editors.len();
    editors.retain(|_, open| open.last_used.elapsed() < limit);
    let evicted = before - editors.len();
    if evicted > 0 {
        tracing::info!(evicted, open = editors.len(), "dropped idle editors");
    }
}

#[derive(Deserialize)]
pub struct SwitchBatchRequest {
    batch_id: String,
}

#[derive(Deserialize)]
pub struct CellRequest {
    at: SlotRef,
}

#[derive(Deserialize)]
pub struct AddSubjectRequest {
    subject_id: String,
    teacher_id: Option<String>,
    #[serde(default)]
    confirmed: bool,
}

#[derive(Deserialize)]
pub struct DragSubjectRequest {
    subject_id: String,
}

#[derive(Deserialize)]
pub struct DropRequest {
    at: SlotRef,
    payload: String,
    #[serde(default)]
    confirmed: bool,
}

#[derive(Deserialize)]
pub struct TeacherRequest {
    at: SlotRef,
    #[serde(default)]
    teacher_id: String,
    teacher_name: Option<String>,
}

#[derive(Deserialize)]
pub struct RemoveRequest {
    at: SlotRef,
    #[serde(default)]
    confirmed: bool,
}

fn error_response(e: &EditorError) -> HttpResponse {
    tracing::warn!(error = %e, "request rejected");
    HttpResponse::BadRequest().json(serde_json::json!({"success": false, "error": e.to_string()}))
}

fn no_editor() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({"success": false, "error": "No timetable loaded"}))
}

/// Runs `f` against the editor of the calling session
fn with_editor<F>(session: &Session, state: &AppState, f: F) -> Result<HttpResponse>
where
    F: FnOnce(&mut TimetableEditor) -> Result<HttpResponse, EditorError>,
{
    let Some(id) = session.get::<String>(EDITOR_KEY)? else {
        return Ok(no_editor());
    };
    let mut editors = state.editors()?;
    let Some(open) = editors.get_mut(&id) else {
        return Ok(no_editor());
    };
    open.last_used = Instant::now();
    Ok(f(&mut open.editor).unwrap_or_else(|e| error_response(&e)))
}

fn new_editor_id() -> String {
    let id: u128 = rand::thread_rng().gen();
    format!("{:032x}", id)
}

// Page load: the server-rendered inputs open a new editor for this session
async fn load_page(
    inputs: web::Json<PageInputs>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let config = &state.config;
    let editor = match TimetableEditor::from_page(&inputs, &config.days, config.periods_per_day) {
        Ok(editor) => editor,
        Err(e) => return Ok(error_response(&e)),
    };

    let body = serde_json::json!({
        "success": true,
        "current_batch": editor.current_batch(),
        "days": editor.grid().days(),
        "periods_per_day": editor.grid().periods_per_day(),
        "subjects": editor.subjects(),
        "print_link": editor.print_link(&config.print_base_url),
        "timetable_data": editor.timetable_data(),
        "toast": crate::display::Toast::info(
            "Welcome to Timetable Editor",
            "Drag and drop subjects to create your timetable.",
        ),
    });

    let id = session
        .get::<String>(EDITOR_KEY)?
        .unwrap_or_else(new_editor_id);
    session.insert(EDITOR_KEY, &id)?;

    let mut editors = state.editors()?;
    evict_idle(&mut editors, state.idle_limit());
    editors.insert(id, OpenEditor::new(editor));

    Ok(HttpResponse::Ok().json(body))
}

async fn get_subjects(session: Session, state: web::Data<AppState>) -> Result<HttpResponse> {
    with_editor(&session, &state, |editor| {
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "current_batch": editor.current_batch(),
            "subjects": editor.subjects(),
        })))
    })
}

async fn switch_batch(
    req: web::Json<SwitchBatchRequest>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let print_base = state.config.print_base_url.clone();
    with_editor(&session, &state, |editor| {
        let subjects = editor.switch_batch(&req.batch_id)?;
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "current_batch": editor.current_batch(),
            "subjects": subjects,
            "print_link": editor.print_link(&print_base),
        })))
    })
}

async fn select_cell(
    req: web::Json<CellRequest>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    with_editor(&session, &state, |editor| {
        let selected = editor.select_cell(req.at)?;
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "selected": selected,
            "target": editor.selected(),
        })))
    })
}

async fn add_subject(
    req: web::Json<AddSubjectRequest>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    with_editor(&session, &state, |editor| {
        let feedback = editor.add_to_selected(&req.subject_id, req.teacher_id.as_deref(), req.confirmed)?;
        Ok(HttpResponse::Ok().json(feedback))
    })
}

async fn drag_subject(
    req: web::Json<DragSubjectRequest>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    with_editor(&session, &state, |editor| {
        let payload = editor.drag_subject(&req.subject_id)?;
        Ok(HttpResponse::Ok().json(serde_json::json!({"payload": payload})))
    })
}

async fn drag_cell(
    req: web::Json<CellRequest>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    with_editor(&session, &state, |editor| {
        let payload = editor.drag_cell(req.at)?;
        Ok(HttpResponse::Ok().json(serde_json::json!({"payload": payload})))
    })
}

async fn drag_end(session: Session, state: web::Data<AppState>) -> Result<HttpResponse> {
    with_editor(&session, &state, |editor| {
        editor.end_drag();
        Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
    })
}

async fn drop_on_cell(
    req: web::Json<DropRequest>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    with_editor(&session, &state, |editor| {
        let feedback = editor.drop_on(req.at, &req.payload, req.confirmed)?;
        Ok(HttpResponse::Ok().json(feedback))
    })
}

async fn change_teacher(
    req: web::Json<TeacherRequest>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    with_editor(&session, &state, |editor| {
        let feedback = editor.change_teacher(req.at, &req.teacher_id, req.teacher_name.as_deref())?;
        Ok(HttpResponse::Ok().json(feedback))
    })
}

async fn remove_assignment(
    req: web::Json<RemoveRequest>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    with_editor(&session, &state, |editor| {
        let feedback = editor.remove(req.at, req.confirmed)?;
        Ok(HttpResponse::Ok().json(feedback))
    })
}

async fn apply_commands(
    commands: web::Json<Vec<Command>>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let commands = commands.into_inner();
    with_editor(&session, &state, |editor| {
        let outcomes = editor.apply_all(commands)?;
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "outcomes": outcomes,
            "timetable_data": editor.timetable_data(),
        })))
    })
}

// The hidden form field value
async fn timetable_data(session: Session, state: web::Data<AppState>) -> Result<HttpResponse> {
    with_editor(&session, &state, |editor| {
        Ok(HttpResponse::Ok()
            .content_type("application/json")
            .body(editor.timetable_data().to_string()))
    })
}

async fn save_timetable(session: Session, state: web::Data<AppState>) -> Result<HttpResponse> {
    with_editor(&session, &state, |editor| {
        let (data, toast) = editor.save()?;
        let submitted = parse_submission(&data)?;
        let rows = submission_rows(&submitted, editor.grid().days())?;
        tracing::info!(rows = rows.len(), "timetable submitted");
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "timetable_data": data,
            "rows": rows,
            "toast": toast,
        })))
    })
}

async fn get_conflicts(session: Session, state: web::Data<AppState>) -> Result<HttpResponse> {
    with_editor(&session, &state, |editor| {
        let (conflicts, toast) = editor.conflict_feedback();
        let report = conflict_report(&conflicts, editor.grid().days());
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "conflicts": conflicts,
            "report": report,
            "toast": toast,
        })))
    })
}

async fn print_link(session: Session, state: web::Data<AppState>) -> Result<HttpResponse> {
    let base = state.config.print_base_url.clone();
    with_editor(&session, &state, |editor| {
        Ok(HttpResponse::Ok().json(serde_json::json!({"href": editor.print_link(&base)})))
    })
}

async fn period_times_view(session: Session, state: web::Data<AppState>) -> Result<HttpResponse> {
    let config = state.config.clone();
    with_editor(&session, &state, |editor| {
        let times = period_times(&config.day_start, editor.grid().periods_per_day(), config.lunch_after);
        Ok(HttpResponse::Ok().json(serde_json::json!({"period_times": times})))
    })
}

async fn download_csv(session: Session, state: web::Data<AppState>) -> Result<HttpResponse> {
    let lunch_after = state.config.lunch_after;
    with_editor(&session, &state, |editor| {
        let body = timetable_csv(editor.grid(), lunch_after)?;
        let filename = export_filename(chrono::Local::now().naive_local());
        Ok(HttpResponse::Ok()
            .content_type("text/csv")
            .insert_header(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(filename)],
            })
            .body(body))
    })
}

/// Registers the editor routes; shared by the server and the tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/load", web::post().to(load_page))
        .route("/api/subjects", web::get().to(get_subjects))
        .route("/api/batch", web::post().to(switch_batch))
        .route("/api/select", web::post().to(select_cell))
        .route("/api/add", web::post().to(add_subject))
        .route("/api/drag/subject", web::post().to(drag_subject))
        .route("/api/drag/cell", web::post().to(drag_cell))
        .route("/api/drag/end", web::post().to(drag_end))
        .route("/api/drop", web::post().to(drop_on_cell))
        .route("/api/teacher", web::post().to(change_teacher))
        .route("/api/remove", web::post().to(remove_assignment))
        .route("/api/commands", web::post().to(apply_commands))
        .route("/api/timetable_data", web::get().to(timetable_data))
        .route("/api/save", web::post().to(save_timetable))
        .route("/api/conflicts", web::get().to(get_conflicts))
        .route("/api/print_link", web::get().to(print_link))
        .route("/api/period_times", web::get().to(period_times_view))
        .route("/download_csv", web::get().to(download_csv));
}

fn session_middleware(key: Key, ttl: Duration) -> SessionMiddleware<CookieSessionStore> {
    let ttl = CookieDuration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_secure(false)
        .session_lifecycle(PersistentSession::default().session_ttl(ttl))
        .build()
}

pub async fn start_server(config: EditorConfig) -> std::io::Result<()> {
    let bind = (config.bind.clone(), config.port);
    let app_state = web::Data::new(AppState::new(config));
    let session_ttl = app_state.idle_limit();
    let key = Key::generate();

    tracing::info!(address = %bind.0, port = bind.1, "starting timetable editor");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(session_middleware(key.clone(), session_ttl))
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await
}
