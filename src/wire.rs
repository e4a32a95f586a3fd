use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::{Sink, SinkExt, stream};
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::messages::response::NotificationResponse;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};

use crate::auth::TablebookAuthSource;
use crate::engine::{Engine, EngineError};
use crate::identity::{ClientRegistry, Identity, IdentityError};
use crate::model::*;
use crate::observability::{self, command_label};
use crate::pictures::PictureError;
use crate::sql::{self, Command, ItemFilter, ReservationFilter};
use crate::venue::VenueManager;

/// One handler per connection: it owns the connection's LISTEN subscriptions.
pub struct TablebookHandler {
    venues: Arc<VenueManager>,
    clients: Arc<ClientRegistry>,
    query_parser: Arc<TablebookQueryParser>,
    listeners: Mutex<HashMap<String, broadcast::Receiver<Event>>>,
}

impl TablebookHandler {
    pub fn new(venues: Arc<VenueManager>, clients: Arc<ClientRegistry>) -> Self {
        Self {
            venues,
            clients,
            query_parser: Arc::new(TablebookQueryParser),
            listeners: Mutex::new(HashMap::new()),
        }
    }

    async fn resolve_engine<C: ClientInfo>(&self, client: &C) -> PgWireResult<Arc<Engine>> {
        let db = client
            .metadata()
            .get("database")
            .cloned()
            .unwrap_or_else(|| "default".to_string());
        self.venues
            .get_or_create(&db)
            .await
            .map_err(|e| user_error("08006", format!("venue error: {e}")))
    }

    fn identity<C: ClientInfo>(&self, client: &C) -> Identity {
        self.clients
            .identify(client.metadata().get("user").map(String::as_str))
    }

    /// Flush pending notifications, then parse, authorize and run one statement.
    async fn run<C>(&self, client: &mut C, query: &str) -> PgWireResult<Response>
    where
        C: ClientInfo + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(client).await?;
        self.deliver_notifications(client).await?;

        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        let label = command_label(&cmd);
        if let Err(e) = self.identity(client).authorize(&cmd) {
            metrics::counter!(observability::AUTH_FAILURES_TOTAL, "reason" => "scope").increment(1);
            return Err(identity_err(e));
        }

        let started = Instant::now();
        let result = self.execute_command(&engine, cmd).await;
        metrics::histogram!(observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(observability::QUERIES_TOTAL, "command" => label, "status" => status)
            .increment(1);
        result
    }

    /// Send everything the subscribed channels received since the last query.
    async fn deliver_notifications<C>(&self, client: &mut C) -> PgWireResult<()>
    where
        C: ClientInfo + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let mut pending = Vec::new();
        {
            let mut listeners = self.listeners.lock().await;
            for (channel, rx) in listeners.iter_mut() {
                loop {
                    match rx.try_recv() {
                        Ok(event) => pending.push((channel.clone(), event.notification_payload())),
                        Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                            warn!(channel = %channel, skipped, "listener lagged, notifications dropped");
                        }
                        Err(_) => break,
                    }
                }
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let pid = client.pid_and_secret_key().0;
        for (channel, payload) in pending {
            client
                .send(PgWireBackendMessage::NotificationResponse(
                    NotificationResponse::new(pid, channel, payload),
                ))
                .await?;
        }
        Ok(())
    }

    async fn execute_command(&self, engine: &Engine, cmd: Command) -> PgWireResult<Response> {
        match cmd {
            // ── Reservations ─────────────────────────────────
            Command::InsertReservation { input } => {
                let id = engine.create_reservation(input).await.map_err(engine_err)?;
                debug!(reservation = %id, "reservation created");
                Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
            }
            Command::UpdateReservation { id, patch } => {
                engine.update_reservation(id, patch).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("UPDATE").with_rows(1)))
            }
            Command::DeleteReservation { id } => {
                engine.delete_reservation(id).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("DELETE").with_rows(1)))
            }
            Command::SelectReservations { filter } => {
                let (rows, total) = match filter {
                    ReservationFilter::All(page) => {
                        let page = engine.list_reservations(page).await.map_err(engine_err)?;
                        (page.data, page.count)
                    }
                    ReservationFilter::ById(id) => match engine.get_reservation(id).await {
                        Ok(r) => (vec![r], 1),
                        Err(EngineError::NotFound(_)) => (vec![], 0),
                        Err(e) => return Err(engine_err(e)),
                    },
                    ReservationFilter::ByIds(ids) => {
                        let rows = engine.get_reservations(&ids).await.map_err(engine_err)?;
                        let total = rows.len();
                        (rows, total)
                    }
                };
                reservation_rows(rows, total)
            }

            // ── Blocked windows ──────────────────────────────
            Command::InsertBlockedWindow { id, window } => {
                engine.add_blocked_window(id, window).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
            }
            Command::DeleteBlockedWindow { id } => {
                engine.remove_blocked_window(id).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("DELETE").with_rows(1)))
            }
            Command::SelectBlockedWindows { date } => {
                window_rows(engine.list_blocked_windows(date).await)
            }
            Command::RefreshBlockedWindows => {
                let outcome = engine.refresh_blocked_windows().await.map_err(engine_err)?;
                debug!(changed = outcome.changed, derived = outcome.derived, "manual refresh");
                Ok(Response::Execution(Tag::new("CALL")))
            }

            // ── Catalog ──────────────────────────────────────
            Command::InsertCategory { input } => {
                engine.create_category(input).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
            }
            Command::DeleteCategory { id } => {
                engine.delete_category(id).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("DELETE").with_rows(1)))
            }
            Command::SelectCategories => category_rows(engine.list_categories()),
            Command::InsertItem { input } => {
                engine.create_item(input).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
            }
            Command::UpdateItem { id, patch } => {
                engine.update_item(id, patch).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("UPDATE").with_rows(1)))
            }
            Command::DeleteItem { id } => {
                engine.delete_item(id).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("DELETE").with_rows(1)))
            }
            Command::SelectItems { filter } => {
                let (rows, total) = match filter {
                    ItemFilter::All(page) => paged(engine.list_items(page))?,
                    ItemFilter::ById(id) => match engine.get_item(id) {
                        Ok(item) => (vec![item], 1),
                        Err(EngineError::NotFound(_)) => (vec![], 0),
                        Err(e) => return Err(engine_err(e)),
                    },
                    ItemFilter::ByIds(ids) => {
                        let rows = engine.get_items(&ids).map_err(engine_err)?;
                        let total = rows.len();
                        (rows, total)
                    }
                    ItemFilter::ByCategory(id, page) => paged(engine.items_by_category(id, page))?,
                    ItemFilter::TitlePrefix(prefix, page) => {
                        paged(engine.items_by_title_prefix(&prefix, page))?
                    }
                };
                item_rows(rows, total)
            }
            Command::SelectItemPicture { item_id } => {
                let picture = engine.get_item_picture(item_id).await.map_err(engine_err)?;
                let schema = Arc::new(picture_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&item_id.to_string())?;
                encoder.encode_field(&picture.file_name)?;
                encoder.encode_field(&picture.mime_type.to_string())?;
                encoder.encode_field(&picture.bytes)?;
                let rows = vec![Ok(encoder.take_row())];
                Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
            }

            // ── LISTEN / UNLISTEN ────────────────────────────
            Command::Listen { channel } => {
                if ![RESERVATIONS_CHANNEL, BLOCKED_WINDOWS_CHANNEL, CATALOG_CHANNEL]
                    .contains(&channel.as_str())
                {
                    return Err(user_error(
                        "42704",
                        format!(
                            "unknown channel: {channel} (expected {RESERVATIONS_CHANNEL}, \
                             {BLOCKED_WINDOWS_CHANNEL} or {CATALOG_CHANNEL})"
                        ),
                    ));
                }
                let mut listeners = self.listeners.lock().await;
                if !listeners.contains_key(&channel) {
                    let rx = engine.notify.subscribe(&channel);
                    listeners.insert(channel, rx);
                }
                Ok(Response::Execution(Tag::new("LISTEN")))
            }
            Command::Unlisten { channel } => {
                self.listeners.lock().await.remove(&channel);
                Ok(Response::Execution(Tag::new("UNLISTEN")))
            }
            Command::UnlistenAll => {
                self.listeners.lock().await.clear();
                Ok(Response::Execution(Tag::new("UNLISTEN")))
            }
        }
    }
}

fn paged<T>(result: Result<Page<T>, EngineError>) -> PgWireResult<(Vec<T>, usize)> {
    let page = result.map_err(engine_err)?;
    Ok((page.data, page.count))
}

// ── Result sets ──────────────────────────────────────────────────

fn field(name: &str, ty: Type) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, ty, FieldFormat::Text)
}

fn reservation_schema() -> Vec<FieldInfo> {
    vec![
        field("id", Type::VARCHAR),
        field("date", Type::DATE),
        field("time", Type::TIME),
        field("party_size", Type::INT4),
        field("game", Type::BOOL),
        field("eat_and_play", Type::BOOL),
        field("name", Type::VARCHAR),
        field("surname", Type::VARCHAR),
        field("phone", Type::VARCHAR),
        field("message", Type::VARCHAR),
        field("total_count", Type::INT8),
    ]
}

fn blocked_window_schema() -> Vec<FieldInfo> {
    vec![
        field("id", Type::VARCHAR),
        field("date", Type::DATE),
        field("start_time", Type::TIME),
        field("end_time", Type::TIME),
        field("source", Type::VARCHAR),
    ]
}

fn category_schema() -> Vec<FieldInfo> {
    vec![
        field("id", Type::VARCHAR),
        field("title", Type::VARCHAR),
        field("description", Type::VARCHAR),
        field("picture_file_name", Type::VARCHAR),
    ]
}

fn item_schema() -> Vec<FieldInfo> {
    vec![
        field("id", Type::VARCHAR),
        field("title", Type::VARCHAR),
        field("subtitle", Type::VARCHAR),
        field("description", Type::VARCHAR),
        field("price", Type::NUMERIC),
        field("picture_file_name", Type::VARCHAR),
        field("category_id", Type::VARCHAR),
        field("total_count", Type::INT8),
    ]
}

fn picture_schema() -> Vec<FieldInfo> {
    vec![
        field("item_id", Type::VARCHAR),
        field("file_name", Type::VARCHAR),
        field("mime_type", Type::VARCHAR),
        field("data", Type::BYTEA),
    ]
}

/// Result columns for a statement, by the table it reads. Empty for commands.
fn schema_for_sql(sql: &str) -> Vec<FieldInfo> {
    let tokens: Vec<String> = sql
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| c == ';' || c == '"').to_lowercase())
        .collect();
    if tokens.first().map(String::as_str) != Some("select") {
        return vec![];
    }
    let table = tokens
        .iter()
        .position(|t| t == "from")
        .and_then(|i| tokens.get(i + 1));
    match table.map(String::as_str) {
        Some("reservations") => reservation_schema(),
        Some("blocked_windows") => blocked_window_schema(),
        Some("categories") => category_schema(),
        Some("items") => item_schema(),
        Some("item_pictures") => picture_schema(),
        _ => vec![],
    }
}

fn fmt_time(t: chrono::NaiveTime) -> String {
    t.format("%H:%M:%S").to_string()
}

fn reservation_rows(rows: Vec<ReservationInfo>, total: usize) -> PgWireResult<Response> {
    let schema = Arc::new(reservation_schema());
    let total = total as i64;
    let rows: Vec<PgWireResult<_>> = rows
        .into_iter()
        .map(|r| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&r.id.to_string())?;
            encoder.encode_field(&r.date.to_string())?;
            encoder.encode_field(&fmt_time(r.time))?;
            encoder.encode_field(&(r.party_size as i32))?;
            encoder.encode_field(&r.game)?;
            encoder.encode_field(&r.eat_and_play)?;
            encoder.encode_field(&r.name)?;
            encoder.encode_field(&r.surname)?;
            encoder.encode_field(&r.phone)?;
            encoder.encode_field(&r.message)?;
            encoder.encode_field(&total)?;
            Ok(encoder.take_row())
        })
        .collect();
    Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
}

fn window_rows(windows: Vec<StoredWindow>) -> PgWireResult<Response> {
    let schema = Arc::new(blocked_window_schema());
    let rows: Vec<PgWireResult<_>> = windows
        .into_iter()
        .map(|w| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&w.id.to_string())?;
            encoder.encode_field(&w.window.date.to_string())?;
            encoder.encode_field(&fmt_time(w.window.start_time))?;
            encoder.encode_field(&fmt_time(w.window.end_time))?;
            encoder.encode_field(&w.source.as_str().to_string())?;
            Ok(encoder.take_row())
        })
        .collect();
    Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
}

fn category_rows(categories: Vec<CatalogCategory>) -> PgWireResult<Response> {
    let schema = Arc::new(category_schema());
    let rows: Vec<PgWireResult<_>> = categories
        .into_iter()
        .map(|c| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&c.id.to_string())?;
            encoder.encode_field(&c.title)?;
            encoder.encode_field(&c.description)?;
            encoder.encode_field(&c.picture_file_name)?;
            Ok(encoder.take_row())
        })
        .collect();
    Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
}

fn item_rows(items: Vec<CatalogItem>, total: usize) -> PgWireResult<Response> {
    let schema = Arc::new(item_schema());
    let total = total as i64;
    let rows: Vec<PgWireResult<_>> = items
        .into_iter()
        .map(|item| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&item.id.to_string())?;
            encoder.encode_field(&item.title)?;
            encoder.encode_field(&item.subtitle)?;
            encoder.encode_field(&item.description)?;
            encoder.encode_field(&item.price.to_string())?;
            encoder.encode_field(&item.picture_file_name)?;
            encoder.encode_field(&item.category_id.to_string())?;
            encoder.encode_field(&total)?;
            Ok(encoder.take_row())
        })
        .collect();
    Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
}

// ── Simple Query Protocol ────────────────────────────────────────

#[async_trait]
impl SimpleQueryHandler for TablebookHandler {
    async fn do_query<C>(
        &self,
        client: &mut C,
        query: &str,
    ) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(vec![self.run(client, query).await?])
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct TablebookQueryParser;

#[async_trait]
impl QueryParser for TablebookQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(schema_for_sql(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for TablebookHandler {
    type Statement = String;
    type QueryParser = TablebookQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let sql = substitute_params(&portal.statement.statement, &portal.parameters);
        self.run(client, &sql).await
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            schema_for_sql(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(schema_for_sql(
            &target.statement.statement,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start
                && let Ok(n) = sql[start..i].parse::<usize>()
            {
                max = max.max(n);
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
/// Highest index first so `$1` never clobbers the prefix of `$10`.
fn substitute_params<B: AsRef<[u8]>>(sql: &str, params: &[Option<B>]) -> String {
    let mut result = sql.to_string();
    for (i, param) in params.iter().enumerate().rev() {
        let placeholder = format!("${}", i + 1);
        let value = match param {
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes.as_ref());
                format!("'{}'", text.replace('\'', "''"))
            }
            None => "NULL".to_string(),
        };
        result = result.replace(&placeholder, &value);
    }
    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct TablebookFactory {
    handler: Arc<TablebookHandler>,
    auth_handler: Arc<
        CleartextPasswordAuthStartupHandler<TablebookAuthSource, DefaultServerParameterProvider>,
    >,
    noop: Arc<NoopHandler>,
}

impl TablebookFactory {
    pub fn new(venues: Arc<VenueManager>, clients: Arc<ClientRegistry>, password: String) -> Self {
        let auth_source = TablebookAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(TablebookHandler::new(venues, clients)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for TablebookFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection until it closes.
pub async fn process_connection(
    socket: TcpStream,
    venues: Arc<VenueManager>,
    clients: Arc<ClientRegistry>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> std::io::Result<()> {
    let factory = Arc::new(TablebookFactory::new(venues, clients, password));
    pgwire::tokio::process_socket(socket, tls, factory).await
}

// ── Errors ───────────────────────────────────────────────────────

fn user_error(code: &str, message: String) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        message,
    )))
}

/// SQLSTATE for an engine failure.
fn engine_sqlstate(e: &EngineError) -> &'static str {
    match e {
        EngineError::NotFound(_) => "P0002",
        EngineError::AlreadyExists(_) => "23505",
        EngineError::Validation(_) => "22023",
        EngineError::Unavailable(_) => "23P01",
        EngineError::HasItems(_) => "23503",
        EngineError::LimitExceeded(_) => "54000",
        EngineError::Picture(PictureError::NotFound(_)) => "P0002",
        EngineError::Picture(PictureError::InvalidName(_)) => "22023",
        EngineError::Picture(PictureError::TooLarge { .. }) => "54000",
        EngineError::Picture(PictureError::Io(_))
        | EngineError::Crypto(_)
        | EngineError::Sweep(_)
        | EngineError::WalError(_) => "XX000",
    }
}

fn engine_err(e: EngineError) -> PgWireError {
    let code = engine_sqlstate(&e);
    if code == "XX000" {
        tracing::error!(error = %e, "internal engine error");
    }
    user_error(code, e.to_string())
}

fn sql_err(e: sql::SqlError) -> PgWireError {
    user_error("42601", e.to_string())
}

fn identity_err(e: IdentityError) -> PgWireError {
    user_error("42501", e.to_string())
}
