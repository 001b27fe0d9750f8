//! Server-rendered single page: sidebar with credentials, upload form,
//! question form, answer and retrieved chunks.
//!
//! Credentials are echoed back into the form fields so the user does not
//! have to retype them between actions. They are never stored server-side.

use crate::models::Answer;
use crate::pipeline::Notice;
use crate::session::ProviderKind;

/// Values shown in the sidebar fields.
#[derive(Debug, Clone)]
pub struct FormValues {
    pub provider: ProviderKind,
    pub provider_api_key: String,
    pub pinecone_api_key: String,
    pub pinecone_environment: String,
    pub index_name: String,
    pub question: String,
}

impl FormValues {
    pub fn empty(provider: ProviderKind) -> Self {
        Self {
            provider,
            provider_api_key: String::new(),
            pinecone_api_key: String::new(),
            pinecone_environment: String::new(),
            index_name: String::new(),
            question: String::new(),
        }
    }
}

/// Everything needed to render one page.
#[derive(Debug, Clone)]
pub struct PageView {
    pub form: FormValues,
    pub notices: Vec<Notice>,
    pub answer: Option<Answer>,
}

impl PageView {
    pub fn new(form: FormValues) -> Self {
        Self {
            form,
            notices: Vec::new(),
            answer: None,
        }
    }
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn render_provider_options(selected: ProviderKind) -> String {
    ProviderKind::ALL
        .iter()
        .map(|p| {
            format!(
                "<option value=\"{}\"{}>{}</option>",
                p.as_str(),
                if *p == selected { " selected" } else { "" },
                p.display_name()
            )
        })
        .collect::<Vec<_>>()
        .join("\n          ")
}

/// Hidden copies of the sidebar fields, so each form posts the credentials.
fn render_credential_fields(form: &FormValues) -> String {
    format!(
        r#"<input type="hidden" name="provider" value="{provider}">
      <input type="hidden" name="provider_api_key" value="{provider_key}">
      <input type="hidden" name="pinecone_api_key" value="{pinecone_key}">
      <input type="hidden" name="pinecone_environment" value="{env}">
      <input type="hidden" name="index_name" value="{index}">"#,
        provider = form.provider.as_str(),
        provider_key = html_escape(&form.provider_api_key),
        pinecone_key = html_escape(&form.pinecone_api_key),
        env = html_escape(&form.pinecone_environment),
        index = html_escape(&form.index_name),
    )
}

fn render_notices(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|n| {
            format!(
                "<div class=\"notice {}\">{}</div>",
                n.level.as_str(),
                html_escape(&n.text)
            )
        })
        .collect::<Vec<_>>()
        .join("\n    ")
}

fn render_answer(answer: &Answer) -> String {
    let chunks = answer
        .matches
        .iter()
        .map(|m| {
            format!(
                "<div class=\"chunk\"><h4>Chunk {} (from: {})</h4><pre>{}</pre></div>",
                m.rank,
                html_escape(m.source_name()),
                html_escape(&m.text)
            )
        })
        .collect::<Vec<_>>()
        .join("\n      ");

    format!(
        r#"<section class="answer">
      <h3>Answer</h3>
      <p>{text}</p>
    </section>
    <details>
      <summary>Show Relevant Document Chunks</summary>
      {chunks}
    </details>"#,
        text = html_escape(&answer.text),
        chunks = chunks,
    )
}

/// Render the full page.
pub fn render_page(view: &PageView) -> String {
    let form = &view.form;
    let answer_html = view.answer.as_ref().map(render_answer).unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Chat with PDFs</title>
  <style>
    body {{ font-family: system-ui, sans-serif; margin: 0; display: flex; color: #1a1a1a; }}
    aside {{ width: 300px; min-height: 100vh; padding: 1.5em; background: #f0f2f6; box-sizing: border-box; }}
    aside label {{ display: block; margin-top: 1em; font-size: 0.9em; }}
    aside input, aside select {{ width: 100%; padding: 0.4em; box-sizing: border-box; }}
    main {{ flex: 1; padding: 2em; max-width: 900px; }}
    .notice {{ padding: 0.6em 1em; margin: 0.5em 0; border-radius: 4px; }}
    .notice.success {{ background: #e6f4ea; }}
    .notice.info {{ background: #e8f0fe; }}
    .notice.warning {{ background: #fef7e0; }}
    .notice.error {{ background: #fce8e6; }}
    .chunk pre {{ white-space: pre-wrap; background: #f7f7f7; padding: 0.8em; }}
    #busy {{ display: none; color: #555; }}
    body.busy #busy {{ display: block; }}
  </style>
</head>
<body>
  <aside>
    <h2>Configuration</h2>
    <form id="credentials" onsubmit="return false">
      <label>Provider
        <select id="provider" name="provider">
          {provider_options}
        </select>
      </label>
      <label>{provider_label} API Key
        <input id="provider_api_key" type="password" value="{provider_key}">
      </label>
      <label>Pinecone API Key
        <input id="pinecone_api_key" type="password" value="{pinecone_key}">
      </label>
      <label>Pinecone Environment
        <input id="pinecone_environment" type="text" value="{env}">
      </label>
      <label>Pinecone Index Name
        <input id="index_name" type="text" value="{index}">
      </label>
    </form>
  </aside>
  <main>
    <h1>Chat with multiple PDFs</h1>
    {notices}
    <form action="/process" method="post" enctype="multipart/form-data">
      {hidden}
      <input type="file" name="pdfs" accept=".pdf,application/pdf" multiple>
      <button type="submit">Process and Vectorize</button>
    </form>
    <form action="/ask" method="post">
      {hidden}
      <label>Ask a question about your documents:
        <input type="text" name="question" value="{question}" style="width: 100%">
      </label>
      <button type="submit">Ask</button>
    </form>
    <p id="busy">Working...</p>
    {answer}
  </main>
  <script>
    // Copy the visible sidebar fields into each form's hidden inputs on submit.
    for (const form of document.querySelectorAll('main form')) {{
      form.addEventListener('submit', () => {{
        for (const name of ['provider', 'provider_api_key', 'pinecone_api_key', 'pinecone_environment', 'index_name']) {{
          form.querySelector('input[name="' + name + '"]').value = document.getElementById(name).value;
        }}
        document.body.classList.add('busy');
      }});
    }}
  </script>
</body>
</html>
"#,
        provider_options = render_provider_options(form.provider),
        provider_label = form.provider.display_name(),
        provider_key = html_escape(&form.provider_api_key),
        pinecone_key = html_escape(&form.pinecone_api_key),
        env = html_escape(&form.pinecone_environment),
        index = html_escape(&form.index_name),
        notices = render_notices(&view.notices),
        hidden = render_credential_fields(form),
        question = html_escape(&form.question),
        answer = answer_html,
    )
}
