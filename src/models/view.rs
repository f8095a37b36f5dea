//! Page views
//!
//! One payload per page; the client renders whatever the session's current
//! page says after every action.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::dataset::DatasetPreview;
use super::session::{Session, SessionStats};
use crate::logic::detection::Detector;
use crate::logic::navigation::Page;

#[derive(Debug, Clone, Serialize)]
pub struct Highlight {
    pub title: &'static str,
    pub description: &'static str,
}

const HIGHLIGHTS: [Highlight; 3] = [
    Highlight { title: "AI Detection", description: "ML-based attack analysis" },
    Highlight { title: "Dashboard", description: "Training and detection insights" },
    Highlight { title: "Secure", description: "User authentication" },
];

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum View {
    Login {
        remembered_user: Option<String>,
        highlights: Vec<Highlight>,
    },
    Signup,
    Home {
        user: Option<String>,
        stats: SessionStats,
    },
    Dashboard {
        user: Option<String>,
        model_trained: bool,
        features: Option<Vec<String>>,
        accuracy: Option<f64>,
        trained_at: Option<DateTime<Utc>>,
        staged_dataset: Option<DatasetPreview>,
    },
}

impl View {
    pub fn render(session: &Session, preview_rows: usize) -> Self {
        match session.page {
            Page::Login => View::Login {
                remembered_user: session.remembered_user.clone(),
                highlights: HIGHLIGHTS.to_vec(),
            },
            Page::Signup => View::Signup,
            Page::Home => View::Home {
                user: session.user.clone(),
                stats: session.stats(),
            },
            Page::Dashboard => {
                let detector = session.detector.as_deref();
                View::Dashboard {
                    user: session.user.clone(),
                    model_trained: detector.is_some(),
                    features: detector.map(|d| d.features().to_vec()),
                    accuracy: detector.map(Detector::accuracy),
                    trained_at: detector.map(Detector::trained_at),
                    staged_dataset: session.staged_dataset.as_deref().map(|ds| ds.head(preview_rows)),
                }
            }
        }
    }

    pub fn page(&self) -> Page {
        match self {
            View::Login { .. } => Page::Login,
            View::Signup => Page::Signup,
            View::Home { .. } => Page::Home,
            View::Dashboard { .. } => Page::Dashboard,
        }
    }
}
