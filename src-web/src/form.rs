//! HTML rendering for the prediction form.
//!
//! The page is generated from [`FIELDS`], so every predictor gets exactly one
//! control: a `<select>` with the closed option list for categorical and 0/1
//! fields, a number input with the declared range for the rest.

use evasao_data::{FIELDS, FieldKind, FieldSpec, FieldValue, StudentRecord};

use crate::error::WebError;
use crate::verdict::Verdict;

/// Browser tab title.
pub const PAGE_TITLE: &str = "Previsão de Evasão Acadêmica";

/// Main heading.
pub const HEADING: &str = "Previsão de Evasão Acadêmica de Estudantes";

/// Header above the inputs.
pub const FORM_HEADER: &str = "Insira os dados do estudante:";

/// Submit button text.
pub const SUBMIT_LABEL: &str = "Prever Evasão";

const STYLE: &str = "body{font-family:sans-serif;max-width:46rem;margin:2rem auto;padding:0 1rem}\
label{display:block;margin-top:.8rem;font-weight:600}\
select,input{width:100%;padding:.35rem;margin-top:.2rem}\
button{margin-top:1.4rem;padding:.5rem 1.2rem}\
.alert{padding:.9rem;margin:1.2rem 0;border-radius:.4rem}\
.alert-error{background:#fde8e8;color:#8a1c1c}\
.alert-success{background:#e6f6ea;color:#1d6b34}";

/// What to show below the form after a submission.
#[derive(Debug, Clone, Copy)]
pub enum Notice<'a> {
    Verdict(&'a Verdict),
    /// A submission that failed validation.
    Problem(&'a str),
}

/// Render the form filled with `record`, optionally followed by a notice.
pub fn render_page(record: &StudentRecord, notice: Option<Notice<'_>>) -> String {
    let mut body = String::new();
    body.push_str(&format!("<h1>{}</h1>\n", escape(HEADING)));
    body.push_str(&format!("<h2>{}</h2>\n", escape(FORM_HEADER)));
    body.push_str("<form method=\"post\" action=\"/predict\">\n");

    for (spec, (_, value)) in FIELDS.iter().zip(record.values()) {
        body.push_str(&render_field(spec, value));
    }

    body.push_str(&format!(
        "<button type=\"submit\">{}</button>\n",
        escape(SUBMIT_LABEL)
    ));
    body.push_str("</form>\n");

    match notice {
        Some(Notice::Verdict(verdict)) => body.push_str(&format!(
            "<div class=\"alert alert-{}\" role=\"status\">{}</div>\n",
            verdict.style.as_str(),
            escape(&verdict.message)
        )),
        Some(Notice::Problem(message)) => body.push_str(&format!(
            "<div class=\"alert alert-error\" role=\"alert\">{}</div>\n",
            escape(message)
        )),
        None => {}
    }

    document(PAGE_TITLE, &body)
}

/// Render a standalone page for an error that prevents the form from showing.
pub fn render_error_page(err: &WebError) -> String {
    let body = format!(
        "<h1>{}</h1>\n\
         <div class=\"alert alert-error\" role=\"alert\"><strong>{}</strong><br>{}</div>\n",
        escape(HEADING),
        err.error_code(),
        escape(&err.to_string())
    );
    document(PAGE_TITLE, &body)
}

fn render_field(spec: &FieldSpec, value: FieldValue<'_>) -> String {
    let column = escape(spec.column);
    let label = format!("<label for=\"{column}\">{}</label>\n", escape(spec.label));

    let control = match spec.kind {
        FieldKind::Categorical { options } => {
            render_select(&column, options.iter().copied(), &value.to_string())
        }
        FieldKind::Flag => render_select(&column, ["0", "1"].into_iter(), &value.to_string()),
        FieldKind::Integer { min, max, .. } => format!(
            "<input type=\"number\" id=\"{column}\" name=\"{column}\" \
             min=\"{min}\" max=\"{max}\" step=\"1\" value=\"{value}\" required>\n"
        ),
        FieldKind::Decimal { min, max, .. } => format!(
            "<input type=\"number\" id=\"{column}\" name=\"{column}\" \
             min=\"{min}\" max=\"{max}\" step=\"0.01\" value=\"{value}\" required>\n"
        ),
    };

    label + &control
}

fn render_select<'a>(
    column: &str,
    options: impl Iterator<Item = &'a str>,
    current: &str,
) -> String {
    let mut html = format!("<select id=\"{column}\" name=\"{column}\">\n");
    for option in options {
        let selected = if option == current { " selected" } else { "" };
        let option = escape(option);
        html.push_str(&format!(
            "<option value=\"{option}\"{selected}>{option}</option>\n"
        ));
    }
    html.push_str("</select>\n");
    html
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"pt\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        escape(title)
    )
}

/// Escape text for use in HTML content and quoted attributes.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
