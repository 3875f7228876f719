use crate::orchestrator::RequestState;

/// What the result area shows. Derived from [`RequestState`] and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultView {
    Placeholder,
    Loading,
    Error { message: String },
    Image { data_uri: String },
}

impl From<&RequestState> for ResultView {
    fn from(state: &RequestState) -> Self {
        match state {
            RequestState::Idle => ResultView::Placeholder,
            RequestState::Loading => ResultView::Loading,
            RequestState::Failed(message) => ResultView::Error {
                message: message.clone(),
            },
            RequestState::Succeeded(image) => ResultView::Image {
                data_uri: image.to_data_uri(),
            },
        }
    }
}

impl ResultView {
    pub fn render_text(&self) -> String {
        match self {
            ResultView::Placeholder => "Your virtual try-on will appear here.\n\
                 Upload an image of a person and an item of clothing to get started."
                .to_string(),
            ResultView::Loading => {
                "Generating your new look...\nThis may take a moment.".to_string()
            }
            ResultView::Error { message } => format!("Error\n{}", message),
            ResultView::Image { data_uri } => {
                let media_type = data_uri
                    .strip_prefix("data:")
                    .and_then(|rest| rest.split(';').next())
                    .unwrap_or("image");
                format!(
                    "Generated virtual try-on ({}, {} chars)",
                    media_type,
                    data_uri.len()
                )
            }
        }
    }

    pub fn render_html(&self) -> String {
        match self {
            ResultView::Placeholder => concat!(
                r#"<div class="result idle">"#,
                "<h3>Your virtual try-on will appear here</h3>",
                "<p>Upload an image of a person and an item of clothing to get started.</p>",
                "</div>"
            )
            .to_string(),
            ResultView::Loading => concat!(
                r#"<div class="result loading">"#,
                "<h3>Generating your new look...</h3>",
                "<p>This may take a moment.</p>",
                "</div>"
            )
            .to_string(),
            ResultView::Error { message } => format!(
                r#"<div class="result error"><h3>Error</h3><p>{}</p></div>"#,
                escape_html(message)
            ),
            ResultView::Image { data_uri } => format!(
                r#"<div class="result success"><img src="{}" alt="Generated virtual try-on"></div>"#,
                escape_html(data_uri)
            ),
        }
    }
}

pub fn render_text(state: &RequestState) -> String {
    ResultView::from(state).render_text()
}

pub fn render_html(state: &RequestState) -> String {
    ResultView::from(state).render_html()
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
