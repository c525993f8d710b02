//! # Templates Maud — HTML Server-Side Rendering
//!
//! Padrão **Hypermedia-Driven**: o servidor devolve fragmentos HTML e o
//! HTMX os injeta no DOM. O único JavaScript da aplicação é o listener SSE
//! da barra de progresso e o polling do `/status`.
//!
//! ## Templates Disponíveis
//!
//! | Função | Tipo | Descrição |
//! |--------|------|-----------|
//! | [`full_page()`] | Página completa | Upload, extração, resultados |
//! | [`loaded_fragment()`] | Fragment HTMX | Resumo do dataset + prévia |
//! | [`results_fragment()`] | Fragment HTMX | Sumário, gráfico, busca, tabela |
//! | [`search_fragment()`] | Fragment HTMX | Contagem + linhas encontradas |
//! | [`keyword_chart()`] | SVG inline | Barras das 15 keywords mais frequentes |
//!
//! ## Layout Principal (`full_page`)
//!
//! ```text
//! ┌──────────────── nav-bar ────────────────────┐
//! │ KW │ Chat Keyword Extractor            │ ● │
//! ├─────────────────────────────────────────────┤
//! │ [📂 CSV]  [🔑 Extrair keywords]  ▓▓▓▓░░░░   │
//! ├─────────────────────────────────────────────┤
//! │ #dataset-panel  (resumo + prévia)           │
//! ├─────────────────────────────────────────────┤
//! │ #results-panel  (gráfico, busca, tabela)    │
//! └─────────────────────────────────────────────┘
//! ```

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::analytics::KeywordCount;
use crate::core::{KeywordResult, WorkingSet};
use crate::pipeline::RunSummary;

/// Linhas exibidas na prévia do dataset carregado.
const PREVIEW_ROWS: usize = 10;

// Geometria do gráfico de barras (unidades do viewBox).
const BAR_WIDTH: usize = 36;
const BAR_GAP: usize = 14;
const CHART_HEIGHT: usize = 220;
const LABEL_AREA: usize = 110;
const AXIS_MARGIN: usize = 40;

/// Página principal do dashboard.
pub fn full_page() -> Markup {
    html! {
        (DOCTYPE)
        html lang="pt-BR" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Chat Keyword Extractor" }
                link rel="stylesheet" href="/assets/style.css";
                script src="https://unpkg.com/htmx.org@2.0.4" {}
            }
            body {
                div class="app-shell" {
                    nav class="nav-bar" {
                        a href="/" class="nav-brand" {
                            span class="nav-brand-icon" { "KW" }
                            span class="nav-brand-text" { "Chat " em { "Keyword" } " Extractor" }
                        }
                        div class="nav-status" id="nav-status" {
                            span class="nav-status-dot loading" id="status-dot" {}
                            span id="status-text" { "carregando modelo..." }
                        }
                    }

                    main class="dashboard" {
                        section class="toolbar" {
                            form id="upload-form"
                                hx-post="/upload"
                                hx-target="#dataset-panel"
                                hx-swap="innerHTML"
                                hx-encoding="multipart/form-data" {
                                label class="toolbar-btn" {
                                    "📂 Carregar CSV"
                                    input type="file" name="csv" accept=".csv"
                                        style="display:none"
                                        onchange="this.form.requestSubmit()";
                                }
                            }

                            button class="toolbar-btn primary" id="extract-btn"
                                hx-post="/extract"
                                hx-target="#results-panel"
                                hx-swap="innerHTML" {
                                "🔑 Extrair keywords"
                            }

                            div class="progress" id="progress-container" style="display:none" {
                                div class="progress-label" id="progress-label" { "Aguardando..." }
                                div class="progress-bar" {
                                    div class="progress-fill" id="progress-fill" style="width:0%" {}
                                }
                            }
                        }

                        section id="dataset-panel" class="panel" {
                            div class="panel-empty" {
                                "Carregue um CSV com as colunas "
                                code { "chat_id" } ", " code { "role" } " e " code { "message" } "."
                            }
                        }

                        section id="results-panel" class="panel" {}
                    }
                }

                (PreEscaped(r#"<script>
document.addEventListener('DOMContentLoaded', function() {
  function checkModelStatus() {
    fetch('/status')
      .then(function(r) { return r.json(); })
      .then(function(data) {
        var dot = document.getElementById('status-dot');
        var text = document.getElementById('status-text');
        if (data.ready) {
          dot.classList.remove('loading');
          text.textContent = 'pronto · ' + data.state;
        } else {
          setTimeout(checkModelStatus, 3000);
        }
      })
      .catch(function() { setTimeout(checkModelStatus, 5000); });
  }
  checkModelStatus();
});

(function() {
  var container = document.getElementById('progress-container');
  var label = document.getElementById('progress-label');
  var fill = document.getElementById('progress-fill');
  var es = new EventSource('/events');
  es.onmessage = function(e) {
    try {
      var ev = JSON.parse(e.data);
      if (ev.type === 'Started') {
        container.style.display = '';
        fill.style.width = '0%';
        label.textContent = '0 / ' + ev.total;
      } else if (ev.type === 'Progress') {
        var pct = ev.total ? Math.round(100 * ev.processed / ev.total) : 100;
        fill.style.width = pct + '%';
        label.textContent = ev.processed + ' / ' + ev.total;
      } else if (ev.type === 'Completed') {
        fill.style.width = '100%';
        label.textContent = 'Concluído: ' + ev.succeeded + ' de ' + ev.total +
          (ev.failed ? ' (' + ev.failed + ' falharam)' : '');
      } else if (ev.type === 'Error') {
        label.textContent = 'Erro: ' + ev.message;
      }
    } catch(err) {}
  };
})();
</script>"#))
            }
        }
    }
}

/// Fragmento exibido enquanto o modelo carrega em background.
pub fn loading_fragment() -> Markup {
    html! {
        div class="alert loading" {
            "⏳ Modelo carregando, aguarde alguns segundos..."
        }
    }
}

pub fn error_fragment(message: &str) -> Markup {
    html! {
        div class="alert error" { (message) }
    }
}

/// Resumo do dataset recém-carregado e prévia das primeiras linhas.
pub fn loaded_fragment(source: &str, working_set: &WorkingSet) -> Markup {
    let stats = working_set.stats();
    html! {
        div class="dataset-summary" {
            h2 { "📄 " (source) }
            div class="stats" {
                div class="stat" {
                    span class="stat-value" { (stats.input_rows) }
                    span class="stat-label" { "linhas" }
                }
                div class="stat" {
                    span class="stat-value" { (stats.customer_rows) }
                    span class="stat-label" { "de clientes" }
                }
                div class="stat" {
                    span class="stat-value" { (stats.duplicates_removed) }
                    span class="stat-label" { "duplicadas" }
                }
                div class="stat" {
                    span class="stat-value" { (working_set.len()) }
                    span class="stat-label" { "para extração" }
                }
            }
            @if stats.missing_message > 0 {
                p class="note" {
                    (stats.missing_message) " mensagens de cliente sem texto foram ignoradas."
                }
            }
            @if working_set.is_empty() {
                div class="panel-empty" { "Nenhuma mensagem de cliente encontrada." }
            } @else {
                table class="data-table" {
                    thead { tr { th { "chat_id" } th { "message" } } }
                    tbody {
                        @for record in working_set.iter().take(PREVIEW_ROWS) {
                            tr {
                                td { (record.chat_id) }
                                td { (record.message) }
                            }
                        }
                    }
                }
                @if working_set.len() > PREVIEW_ROWS {
                    p class="note" { "… e mais " (working_set.len() - PREVIEW_ROWS) " mensagens." }
                }
            }
        }
    }
}

/// Resultado de uma extração: sumário, gráfico, busca e tabela completa.
pub fn results_fragment(
    summary: &RunSummary,
    write_error: Option<&str>,
    results: &[KeywordResult],
    top: &[KeywordCount],
) -> Markup {
    html! {
        div class="run-summary" {
            "✅ " (summary.succeeded) " de " (summary.total) " mensagens em "
            (summary.elapsed_ms) " ms"
            @if summary.failed > 0 {
                span class="warn" { " · " (summary.failed) " falharam" }
            }
            @if let Some(path) = &summary.output_path {
                " · salvo em " code { (path.display().to_string()) }
            }
            " · " a href="/download" { "baixar CSV" }
        }
        @if let Some(err) = write_error {
            (error_fragment(&format!("Falha ao gravar o CSV: {err}")))
        }

        (keyword_chart(top))

        form class="search-form"
            hx-get="/search"
            hx-target="#search-results"
            hx-swap="innerHTML" {
            input type="text" name="q" placeholder="Buscar keyword (ex.: refund policy)" autocomplete="off";
            button type="submit" { "Buscar" }
        }
        div id="search-results" {}

        h3 { "Todas as mensagens" }
        (results_table(results.iter()))
    }
}

/// Contagem e linhas que contêm a keyword buscada.
pub fn search_fragment(term: &str, hits: &[&KeywordResult]) -> Markup {
    html! {
        @if term.trim().is_empty() {
            p class="note" { "Digite uma keyword para buscar." }
        } @else {
            p class="search-count" {
                strong { (hits.len()) } " mensagens com a keyword “" (term.trim()) "”"
            }
            @if !hits.is_empty() {
                (results_table(hits.iter().copied()))
            }
        }
    }
}

fn results_table<'a>(rows: impl Iterator<Item = &'a KeywordResult>) -> Markup {
    html! {
        table class="data-table" {
            thead { tr { th { "chat_id" } th { "message" } th { "keywords" } } }
            tbody {
                @for result in rows {
                    tr class=[result.failed.then_some("failed")] {
                        td { (result.chat_id) }
                        td { (result.message) }
                        td {
                            @for keyword in &result.keywords {
                                span class="keyword" { (keyword) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Gráfico de barras (keyword no eixo x, contagem no eixo y) em SVG inline.
///
/// Sem keywords → nenhum markup: agregação vazia é um estado válido.
pub fn keyword_chart(top: &[KeywordCount]) -> Markup {
    let Some(max) = top.iter().map(|k| k.count).max() else {
        return html! {};
    };
    let width = AXIS_MARGIN + top.len() * (BAR_WIDTH + BAR_GAP);
    let height = CHART_HEIGHT + LABEL_AREA;

    html! {
        figure class="chart" {
            figcaption { "Top " (top.len()) " keywords" }
            svg xmlns="http://www.w3.org/2000/svg"
                viewBox=(format!("0 0 {width} {height}"))
                role="img" {
                line class="axis" x1=(AXIS_MARGIN) y1="0" x2=(AXIS_MARGIN) y2=(CHART_HEIGHT);
                line class="axis" x1=(AXIS_MARGIN) y1=(CHART_HEIGHT) x2=(width) y2=(CHART_HEIGHT);
                text class="axis-label" x=(AXIS_MARGIN - 6) y="12" text-anchor="end" { (max) }
                text class="axis-label" x=(AXIS_MARGIN - 6) y=(CHART_HEIGHT) text-anchor="end" { "0" }
                @for (i, entry) in top.iter().enumerate() {
                    @let bar_height = entry.count * (CHART_HEIGHT - 10) / max;
                    @let x = AXIS_MARGIN + BAR_GAP / 2 + i * (BAR_WIDTH + BAR_GAP);
                    @let center = x + BAR_WIDTH / 2;
                    rect class="bar"
                        x=(x) y=(CHART_HEIGHT - bar_height)
                        width=(BAR_WIDTH) height=(bar_height) {
                        title { (entry.keyword) ": " (entry.count) }
                    }
                    text class="bar-value" x=(center) y=(CHART_HEIGHT - bar_height - 4) text-anchor="middle" {
                        (entry.count)
                    }
                    text class="bar-label"
                        x=(center) y=(CHART_HEIGHT + 12)
                        text-anchor="end"
                        transform=(format!("rotate(-45 {center} {})", CHART_HEIGHT + 12)) {
                        (entry.keyword)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(keyword: &str, count: usize) -> KeywordCount {
        KeywordCount {
            keyword: keyword.into(),
            count,
        }
    }

    #[test]
    fn empty_chart_renders_nothing() {
        assert!(keyword_chart(&[]).into_string().is_empty());
    }

    #[test]
    fn chart_has_one_bar_per_keyword() {
        let svg = keyword_chart(&[count("refund", 2), count("policy", 1)]).into_string();
        assert_eq!(svg.matches("<rect").count(), 2);
        assert!(svg.contains("refund"));
        assert!(svg.contains("policy"));
    }

    #[test]
    fn keywords_are_escaped() {
        let svg = keyword_chart(&[count("<script>", 1)]).into_string();
        assert!(!svg.contains("<script>"));
        assert!(svg.contains("&lt;script&gt;"));
    }

    #[test]
    fn blank_search_asks_for_term() {
        let html = search_fragment("  ", &[]).into_string();
        assert!(html.contains("Digite uma keyword"));
    }
}
