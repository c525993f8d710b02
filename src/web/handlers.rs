//! # Handlers HTTP — Os Endpoints do Dashboard
//!
//! Cada função pública é um handler Axum, mapeado a uma rota em
//! [`super::create_router()`]. As rotas de interface seguem o padrão
//! **HTMX fragment**; `/status`, `/keywords/top` e `/download` servem
//! JSON/CSV para consumo direto.
//!
//! | Handler | Método | Retorno |
//! |---------|--------|---------|
//! | `index` | GET | HTML completo |
//! | `model_status` | GET | JSON `{ready, state, messages, results}` |
//! | `sse_events` | GET | SSE stream de [`ExtractionEvent`] |
//! | `upload_csv` | POST | HTMX fragment (resumo ou erro de schema) |
//! | `extract` | POST | HTMX fragment (resultados) |
//! | `search` | GET | HTMX fragment (contagem + linhas) |
//! | `top_keywords` | GET | JSON `[{keyword, count}]` |
//! | `download` | GET | `text/csv` |
//!
//! ## Guarda de Model Ready
//!
//! Só `/extract` depende do modelo: com `state.model.get() == None` ele
//! devolve o fragmento "⏳ Modelo carregando...". Upload, busca e download
//! funcionam sobre a sessão.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use futures_util::stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use super::events::ExtractionEvent;
use super::state::AppState;
use super::templates;
use crate::analytics::KeywordCount;
use crate::error::Error;
use crate::pipeline;
use crate::session::{Session, SessionState};

/// Resposta do endpoint `/status`.
#[derive(serde::Serialize)]
pub struct StatusResponse {
    /// `true` quando o modelo de embeddings terminou de carregar.
    pub ready: bool,
    pub state: SessionState,
    /// Mensagens no WorkingSet carregado.
    pub messages: usize,
    /// Resultados da última extração.
    pub results: usize,
}

/// Query string de `/search`.
#[derive(serde::Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

impl Error {
    /// Status HTTP correspondente, para as rotas JSON/CSV.
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Schema { .. } | Error::Csv(_) => StatusCode::BAD_REQUEST,
            Error::InvalidState(_) | Error::StaleExtraction => StatusCode::CONFLICT,
            Error::Io { .. } | Error::Extraction { .. } | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

fn markup_to_html(m: maud::Markup) -> Html<String> {
    Html(m.into_string())
}

/// GET `/` — Página principal.
pub async fn index() -> Html<String> {
    markup_to_html(templates::full_page())
}

/// GET `/status` — Prontidão do modelo e estado da sessão.
///
/// O frontend faz polling a cada 3s durante o carregamento.
pub async fn model_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let session = state.session.lock();
    Json(StatusResponse {
        ready: state.model.get().is_some(),
        state: session.state(),
        messages: session.working_set().map_or(0, |ws| ws.len()),
        results: session.results().map_or(0, |r| r.len()),
    })
}

/// GET `/events` — Stream SSE de eventos de extração.
///
/// Keep-alive a cada 15s; mensagens de subscribers atrasados são descartadas.
pub async fn sse_events(
    State(state): State<AppState>,
) -> Sse<impl futures_util::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.events_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(SseEvent::default().data(data)))
            }
            Err(_) => None,
        }
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// POST `/upload` — Carrega um CSV (campo `csv`) na sessão.
///
/// Erro de schema volta como fragmento de erro e deixa a sessão em `Empty`.
pub async fn upload_csv(State(state): State<AppState>, mut multipart: Multipart) -> Html<String> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Upload multipart inválido");
                return markup_to_html(templates::error_fragment(&format!("Erro no upload: {e}")));
            }
        };
        if field.name() != Some("csv") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Falha ao ler bytes do CSV");
                return markup_to_html(templates::error_fragment(&format!("Erro no upload: {e}")));
            }
        };
        tracing::info!(size_bytes = bytes.len(), filename = %filename, "CSV upload recebido");

        // Parse e validação fora do lock; o lock só instala o resultado.
        let parsed = match tokio::task::spawn_blocking(move || Session::parse_upload(&bytes)).await
        {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(error = %e, "Task de parse do CSV falhou");
                return markup_to_html(templates::error_fragment(&format!(
                    "Falha interna no upload: {e}"
                )));
            }
        };

        let mut session = state.session.lock();
        return markup_to_html(match session.install(&filename, parsed) {
            Ok(working_set) => templates::loaded_fragment(&filename, working_set),
            Err(e) => templates::error_fragment(&e.to_string()),
        });
    }

    tracing::warn!("Nenhum campo csv encontrado no upload multipart");
    markup_to_html(templates::error_fragment("Nenhum arquivo CSV encontrado no upload."))
}

/// POST `/extract` — Extrai keywords de todo o WorkingSet carregado.
///
/// ## Fluxo
///
/// ```text
/// 1. Modelo pronto? (senão: loading)
/// 2. session.begin_extraction() → ticket   (lock curto)
/// 3. spawn_blocking: extract_all() emitindo SSE Progress/RowFailed
/// 4. session.finish_extraction(ticket)     (lock curto; grava o CSV)
/// 5. Renderiza resultados, gráfico e busca
/// ```
pub async fn extract(State(state): State<AppState>) -> Html<String> {
    let Some(service) = state.model.get().cloned() else {
        return markup_to_html(templates::loading_fragment());
    };

    let (ticket, policy) = {
        let session = state.session.lock();
        match session.begin_extraction() {
            Ok(ticket) => (ticket, session.policy()),
            Err(e) => return markup_to_html(templates::error_fragment(&e.to_string())),
        }
    };

    state.emit(ExtractionEvent::Started {
        total: ticket.working_set.len(),
    });

    let working_set = ticket.working_set.clone();
    let progress_state = state.clone();
    let joined = tokio::task::spawn_blocking(move || {
        pipeline::extract_all(&service, &working_set, policy, |progress| {
            progress_state.emit(ExtractionEvent::from_progress(&progress));
        })
    })
    .await;

    let run = match joined {
        Ok(Ok(run)) => run,
        Ok(Err(e)) => return fail_extraction(&state, e.to_string()),
        Err(e) => {
            tracing::error!(error = %e, "Task de extração falhou");
            return fail_extraction(&state, format!("Falha interna na extração: {e}"));
        }
    };

    let mut session = state.session.lock();
    let committed = match session.finish_extraction(ticket, run) {
        Ok(committed) => committed,
        Err(e) => {
            drop(session);
            return fail_extraction(&state, e.to_string());
        }
    };
    state.emit(ExtractionEvent::completed(&committed.summary));

    let write_error = committed.write_error.as_ref().map(|e| e.to_string());
    let results = session.results().unwrap_or_default();
    let top = session.top_keywords().unwrap_or_default();
    markup_to_html(templates::results_fragment(
        &committed.summary,
        write_error.as_deref(),
        results,
        &top,
    ))
}

fn fail_extraction(state: &AppState, message: String) -> Html<String> {
    tracing::warn!(error = %message, "Extração do dashboard não concluída");
    let fragment = templates::error_fragment(&message);
    state.emit(ExtractionEvent::Error { message });
    markup_to_html(fragment)
}

/// GET `/search?q=` — Mensagens cuja lista de keywords contém `q` (exato,
/// sem diferenciar maiúsculas).
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Html<String> {
    let session = state.session.lock();
    markup_to_html(match session.search(&params.q) {
        Ok(hits) => templates::search_fragment(&params.q, &hits),
        Err(e) => templates::error_fragment(&e.to_string()),
    })
}

/// GET `/keywords/top` — As 15 keywords mais frequentes da última extração.
pub async fn top_keywords(State(state): State<AppState>) -> Result<Json<Vec<KeywordCount>>, Error> {
    Ok(Json(state.session.lock().top_keywords()?))
}

/// GET `/download` — CSV de resultados, idêntico ao arquivo gravado.
pub async fn download(State(state): State<AppState>) -> Result<Response, Error> {
    let bytes = state.session.lock().results_csv()?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"cleaned_keywords.csv\"",
            ),
        ],
        bytes,
    )
        .into_response())
}
