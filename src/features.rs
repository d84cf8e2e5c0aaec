//! Yes/no feature states built from configuration.
//!
//! Each configured feature becomes a [`FeatureToggle`]. Toggles are chained
//! in configuration order; a toggle with a preset answer resolves without
//! asking. The background work writes `<output_dir>/<name>.toml`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::FeatureConfig;
use crate::error::{GraphError, UserFacingFailure};
use crate::state_machine::{StateGraph, WizardState, WizardUser, WorkListener};

/// What a feature step writes once the wizard is over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFile {
    pub feature: String,
    pub enabled: bool,
    pub version: String,
    pub configured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
    Abort,
}

fn parse_answer(text: &str) -> Option<Answer> {
    match text.trim().to_lowercase().as_str() {
        "yes" | "y" => Some(Answer::Yes),
        "no" | "n" => Some(Answer::No),
        "abort" => Some(Answer::Abort),
        _ => None,
    }
}

// Replies to an answer are dropped while the user is disconnected.
fn tell(user: &dyn WizardUser, text: &str) {
    if user.is_online() {
        user.send_message(text);
    }
}

pub struct FeatureToggle {
    name: String,
    question: String,
    next: Option<String>,
    preset: Option<bool>,
    enabled: Option<bool>,
    aborted: bool,
    output_dir: PathBuf,
}

impl FeatureToggle {
    pub fn new(config: &FeatureConfig, next: Option<String>, output_dir: &Path) -> Self {
        Self {
            name: config.name.clone(),
            question: config.question.clone(),
            next,
            preset: config.preset,
            enabled: None,
            aborted: false,
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// The answer this step settled on, if any.
    pub fn enabled(&self) -> Option<bool> {
        self.enabled
    }

    fn write_file(&self, version: &str) -> std::io::Result<PathBuf> {
        let file = FeatureFile {
            feature: self.name.clone(),
            enabled: self.enabled.unwrap_or(false),
            version: version.to_string(),
            configured_at: Utc::now(),
        };
        let body = toml::to_string_pretty(&file).map_err(std::io::Error::other)?;
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}.toml", self.name));
        std::fs::write(&path, body)?;
        Ok(path)
    }
}

impl WizardState for FeatureToggle {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_state(&self) -> Option<&str> {
        self.next.as_deref()
    }

    fn guess_answer(&mut self) -> Result<bool, UserFacingFailure> {
        match self.preset {
            Some(enabled) => {
                self.enabled = Some(enabled);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn ask_question(&self, user: &dyn WizardUser) {
        user.send_message(&format!("{} (yes/no/abort)", self.question));
    }

    fn react_on_answer(
        &mut self,
        user: &dyn WizardUser,
        answer: &str,
    ) -> Result<Option<String>, UserFacingFailure> {
        match parse_answer(answer) {
            Some(Answer::Yes) => {
                self.enabled = Some(true);
                Ok(self.next.clone())
            }
            Some(Answer::No) => {
                self.enabled = Some(false);
                Ok(self.next.clone())
            }
            Some(Answer::Abort) => {
                self.aborted = true;
                tell(user, "Setup aborted.");
                Ok(None)
            }
            None => {
                tell(user, "Please answer yes, no or abort.");
                Ok(Some(self.name.clone()))
            }
        }
    }

    fn is_abortion(&self) -> bool {
        self.aborted
    }

    fn do_work(self: Box<Self>, listener: WorkListener) {
        let version = listener
            .version()
            .map(|v| v.version.clone())
            .unwrap_or_default();
        match self.write_file(&version) {
            Ok(path) => {
                tracing::debug!(feature = listener.state(), path = %path.display(), "feature file written");
                let verb = if self.enabled() == Some(true) {
                    "enabled"
                } else {
                    "left disabled"
                };
                listener.on_work_done(format!("{}: {verb}.", self.name));
            }
            Err(e) => listener.on_work_abort(format!(
                "Could not configure {}: {e}",
                self.name
            )),
        }
    }
}

/// Build the wizard graph, one toggle per feature, chained in order.
pub fn build_graph(features: &[FeatureConfig], output_dir: &Path) -> Result<StateGraph, GraphError> {
    let mut graph = StateGraph::new();
    for (idx, feature) in features.iter().enumerate() {
        let next = features.get(idx + 1).map(|f| f.name.clone());
        graph.add(Box::new(FeatureToggle::new(feature, next, output_dir)))?;
    }
    graph.validate()?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::testing::RecordingUser;

    fn feature(name: &str, preset: Option<bool>) -> FeatureConfig {
        FeatureConfig {
            name: name.to_string(),
            question: format!("Enable {name}?"),
            preset,
        }
    }

    #[test]
    fn parses_answers_loosely() {
        assert_eq!(parse_answer(" YES "), Some(Answer::Yes));
        assert_eq!(parse_answer("y"), Some(Answer::Yes));
        assert_eq!(parse_answer("No"), Some(Answer::No));
        assert_eq!(parse_answer("abort"), Some(Answer::Abort));
        assert_eq!(parse_answer("maybe"), None);
    }

    #[test]
    fn preset_resolves_without_asking() {
        let dir = tempfile::tempdir().unwrap();
        let mut toggle = FeatureToggle::new(&feature("chat", Some(false)), None, dir.path());
        assert_eq!(toggle.guess_answer(), Ok(true));
        assert_eq!(toggle.enabled(), Some(false));

        let mut open = FeatureToggle::new(&feature("spawn", None), None, dir.path());
        assert_eq!(open.guess_answer(), Ok(false));
        assert_eq!(open.enabled(), None);
    }

    #[test]
    fn question_lists_choices() {
        let dir = tempfile::tempdir().unwrap();
        let toggle = FeatureToggle::new(&feature("chat", None), None, dir.path());
        let user = RecordingUser::new("alex");
        toggle.ask_question(&user);
        assert_eq!(user.messages(), vec!["Enable chat? (yes/no/abort)"]);
    }

    #[test]
    fn answers_advance_to_next_feature() {
        let dir = tempfile::tempdir().unwrap();
        let user = RecordingUser::new("alex");
        let mut toggle =
            FeatureToggle::new(&feature("chat", None), Some("spawn".into()), dir.path());

        assert_eq!(toggle.react_on_answer(&user, "y"), Ok(Some("spawn".into())));
        assert_eq!(toggle.enabled(), Some(true));
        assert!(!toggle.is_abortion());
    }

    #[test]
    fn last_feature_closes_branch() {
        let dir = tempfile::tempdir().unwrap();
        let user = RecordingUser::new("alex");
        let mut toggle = FeatureToggle::new(&feature("geoip", None), None, dir.path());
        assert_eq!(toggle.react_on_answer(&user, "n"), Ok(None));
        assert!(!toggle.is_abortion());
    }

    #[test]
    fn unknown_answer_reasks_same_feature() {
        let dir = tempfile::tempdir().unwrap();
        let user = RecordingUser::new("alex");
        let mut toggle = FeatureToggle::new(&feature("chat", None), None, dir.path());
        assert_eq!(toggle.react_on_answer(&user, "perhaps"), Ok(Some("chat".into())));
        assert_eq!(user.messages(), vec!["Please answer yes, no or abort."]);
    }

    #[test]
    fn abort_sets_flag() {
        let dir = tempfile::tempdir().unwrap();
        let user = RecordingUser::new("alex");
        let mut toggle =
            FeatureToggle::new(&feature("chat", None), Some("spawn".into()), dir.path());
        assert_eq!(toggle.react_on_answer(&user, "abort"), Ok(None));
        assert!(toggle.is_abortion());
    }

    #[test]
    fn offline_user_gets_no_replies() {
        let dir = tempfile::tempdir().unwrap();
        let user = RecordingUser::new("alex");
        user.set_online(false);
        let mut toggle = FeatureToggle::new(&feature("chat", None), None, dir.path());

        assert_eq!(toggle.react_on_answer(&user, "perhaps"), Ok(Some("chat".into())));
        assert_eq!(toggle.react_on_answer(&user, "abort"), Ok(None));
        assert!(toggle.is_abortion());
        assert!(user.messages().is_empty());
    }

    #[test]
    fn writes_feature_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut toggle = FeatureToggle::new(&feature("protect", Some(true)), None, dir.path());
        toggle.guess_answer().unwrap();

        let path = toggle.write_file("2.9.0").unwrap();
        let written: FeatureFile = toml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.feature, "protect");
        assert!(written.enabled);
        assert_eq!(written.version, "2.9.0");
    }

    #[test]
    fn builds_chained_graph() {
        let dir = tempfile::tempdir().unwrap();
        let graph = build_graph(
            &[feature("chat", None), feature("spawn", None), feature("geoip", None)],
            dir.path(),
        )
        .unwrap();
        assert_eq!(graph.names(), vec!["chat", "spawn", "geoip"]);
        assert_eq!(graph.get(0).unwrap().next_state(), Some("spawn"));
        assert_eq!(graph.get(2).unwrap().next_state(), None);
    }

    #[test]
    fn duplicate_features_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = build_graph(&[feature("chat", None), feature("chat", None)], dir.path());
        assert!(matches!(result, Err(GraphError::DuplicateState(name)) if name == "chat"));
    }

    #[test]
    fn no_features_is_an_empty_graph() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(build_graph(&[], dir.path()), Err(GraphError::Empty)));
    }
}
