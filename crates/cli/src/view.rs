//! Presentation state of the command-line front end.
//!
//! `ViewState::reduce` is pure: it updates the state and returns the side
//! effect the driver should run next, if any.

use std::path::PathBuf;

use calcifer_core::{
    suggested_file_name, Detail, DestinationSelectError, FeatureSensitivity, InputFolder,
    InputSelectError, JobError, JobId, JobOutcome, JobParameters, OutputFormat, SampleOrdering,
};
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    FormatSelected(OutputFormat),
    DetailSelected(Detail),
    SampleOrderingSelected(SampleOrdering),
    FeatureSensitivitySelected(FeatureSensitivity),
    InputSelected(Result<InputFolder, InputSelectError>),
    GoPressed,
    DestinationSelected(Result<PathBuf, DestinationSelectError>),
    JobStarted(Result<JobId, JobError>),
    Outcome(JobOutcome),
    CancelPressed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PickDestination {
        format: OutputFormat,
        suggested_name: Option<String>,
    },
    StartJob(JobParameters),
    CancelJob(JobId),
    /// Cancel was pressed again while the job is still winding down.
    ForceExit,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub format: OutputFormat,
    pub detail: Detail,
    pub sample_ordering: SampleOrdering,
    pub feature_sensitivity: FeatureSensitivity,
    pub input: Option<InputFolder>,
    pub output: Option<PathBuf>,
    pub job: Option<JobId>,
    pub is_processing: bool,
    pub cancel_enabled: bool,
    pub cancel_requested: bool,
    pub progress: f64,
    pub completed: Option<PathBuf>,
    pub alert: Option<String>,
}

impl ViewState {
    pub fn reduce(&mut self, action: ViewAction) -> Option<Effect> {
        trace!(?action, "View action");

        match action {
            ViewAction::FormatSelected(format) => {
                self.format = format;
                None
            }
            ViewAction::DetailSelected(detail) => {
                self.detail = detail;
                None
            }
            ViewAction::SampleOrderingSelected(ordering) => {
                self.sample_ordering = ordering;
                None
            }
            ViewAction::FeatureSensitivitySelected(sensitivity) => {
                self.feature_sensitivity = sensitivity;
                None
            }

            ViewAction::InputSelected(Ok(folder)) => {
                self.input = Some(folder);
                None
            }
            ViewAction::InputSelected(Err(InputSelectError::Cancelled)) => None,
            ViewAction::InputSelected(Err(e)) => {
                self.alert = Some(e.to_string());
                None
            }

            ViewAction::GoPressed => {
                if self.is_processing {
                    return None;
                }
                let input = self.input.as_ref()?;
                Some(Effect::PickDestination {
                    format: self.format,
                    suggested_name: suggested_file_name(input, self.detail, self.format),
                })
            }

            ViewAction::DestinationSelected(Ok(output)) => {
                let input = self.input.as_ref()?;
                let params = JobParameters::new(&input.path, &output)
                    .with_detail(self.detail)
                    .with_sample_ordering(self.sample_ordering)
                    .with_feature_sensitivity(self.feature_sensitivity);

                self.output = Some(output);
                self.progress = 0.0;
                self.completed = None;
                self.is_processing = true;
                self.cancel_enabled = false;
                self.cancel_requested = false;
                Some(Effect::StartJob(params))
            }
            ViewAction::DestinationSelected(Err(DestinationSelectError::Cancelled)) => None,
            ViewAction::DestinationSelected(Err(e)) => {
                self.alert = Some(e.to_string());
                None
            }

            ViewAction::JobStarted(Ok(id)) => {
                self.job = Some(id);
                self.cancel_enabled = true;
                None
            }
            ViewAction::JobStarted(Err(e)) => {
                self.is_processing = false;
                self.cancel_enabled = false;
                self.alert = Some(e.to_string());
                None
            }

            ViewAction::Outcome(JobOutcome::Progress(fraction)) => {
                self.progress = fraction;
                None
            }
            ViewAction::Outcome(JobOutcome::Completed(path)) => {
                self.finish();
                self.progress = 1.0;
                self.completed = Some(path);
                None
            }
            ViewAction::Outcome(JobOutcome::Failed(e)) => {
                self.finish();
                self.alert = Some(e.to_string());
                None
            }

            ViewAction::CancelPressed => {
                if self.cancel_enabled {
                    let id = self.job?;
                    self.finish();
                    self.cancel_requested = true;
                    Some(Effect::CancelJob(id))
                } else if self.cancel_requested {
                    Some(Effect::ForceExit)
                } else {
                    None
                }
            }
        }
    }

    /// One-line description of the selected options.
    pub fn summary(&self) -> String {
        let images = self.input.as_ref().map_or(0, |input| input.image_count);
        format!(
            "Reconstructing {} photos at {} detail as {} ({} samples, {} feature sensitivity)",
            images,
            self.detail.title(),
            self.format.title(),
            self.sample_ordering.title(),
            self.feature_sensitivity.title(),
        )
    }

    /// Progress as a whole percentage.
    pub fn percent(&self) -> u32 {
        (self.progress.clamp(0.0, 1.0) * 100.0).round() as u32
    }

    fn finish(&mut self) {
        self.is_processing = false;
        self.cancel_enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn with_input() -> ViewState {
        let mut state = ViewState::default();
        state.reduce(ViewAction::InputSelected(Ok(InputFolder {
            path: PathBuf::from("/scans/Teapot"),
            image_count: 24,
            preview_image: Some(PathBuf::from("/scans/Teapot/IMG_0001.jpg")),
        })));
        state
    }

    fn running() -> (ViewState, JobId) {
        let mut state = with_input();
        state.reduce(ViewAction::DestinationSelected(Ok(PathBuf::from(
            "/out/model.usdz",
        ))));
        let id = JobId::new();
        state.reduce(ViewAction::JobStarted(Ok(id)));
        (state, id)
    }

    #[test]
    fn test_go_without_input_does_nothing() {
        let mut state = ViewState::default();
        assert_eq!(state.reduce(ViewAction::GoPressed), None);
    }

    #[test]
    fn test_go_suggests_file_name() {
        let mut state = with_input();
        state.reduce(ViewAction::DetailSelected(Detail::Full));

        assert_eq!(
            state.reduce(ViewAction::GoPressed),
            Some(Effect::PickDestination {
                format: OutputFormat::Usdz,
                suggested_name: Some("Teapot_full.usdz".to_string()),
            })
        );

        state.reduce(ViewAction::FormatSelected(OutputFormat::UsdaAndObj));
        assert_eq!(
            state.reduce(ViewAction::GoPressed),
            Some(Effect::PickDestination {
                format: OutputFormat::UsdaAndObj,
                suggested_name: None,
            })
        );
    }

    #[test]
    fn test_destination_starts_job_with_selected_options() {
        let mut state = with_input();
        state.reduce(ViewAction::SampleOrderingSelected(SampleOrdering::Sequential));
        state.reduce(ViewAction::FeatureSensitivitySelected(FeatureSensitivity::High));

        let effect = state.reduce(ViewAction::DestinationSelected(Ok(PathBuf::from(
            "/out/model.usdz",
        ))));
        let Some(Effect::StartJob(params)) = effect else {
            panic!("expected StartJob, got {:?}", effect);
        };
        assert_eq!(params.input_folder, Path::new("/scans/Teapot"));
        assert_eq!(params.output_destination, Path::new("/out/model.usdz"));
        assert_eq!(params.sample_ordering, SampleOrdering::Sequential);
        assert_eq!(params.feature_sensitivity, FeatureSensitivity::High);
        assert!(state.is_processing);
        assert!(!state.cancel_enabled);
    }

    #[test]
    fn test_cancelled_pickers_are_silent() {
        let mut state = with_input();
        state.reduce(ViewAction::InputSelected(Err(InputSelectError::Cancelled)));
        state.reduce(ViewAction::DestinationSelected(Err(
            DestinationSelectError::Cancelled,
        )));
        assert!(state.alert.is_none());
        assert!(!state.is_processing);
    }

    #[test]
    fn test_no_images_shows_alert() {
        let mut state = ViewState::default();
        state.reduce(ViewAction::InputSelected(Err(InputSelectError::NoImagesFound)));
        assert_eq!(
            state.alert.as_deref(),
            Some(InputSelectError::NoImagesFound.to_string().as_str())
        );
        assert!(state.input.is_none());
    }

    #[test]
    fn test_progress_and_completion() {
        let (mut state, _) = running();
        state.reduce(ViewAction::Outcome(JobOutcome::Progress(0.42)));
        assert_eq!(state.percent(), 42);
        assert!(state.is_processing);

        state.reduce(ViewAction::Outcome(JobOutcome::Completed(PathBuf::from(
            "/out/model.usdz",
        ))));
        assert!(!state.is_processing);
        assert_eq!(state.completed, Some(PathBuf::from("/out/model.usdz")));
        assert_eq!(state.percent(), 100);
    }

    #[test]
    fn test_failure_shows_alert() {
        let (mut state, _) = running();
        state.reduce(ViewAction::Outcome(JobOutcome::Failed(JobError::engine(
            "not enough images",
        ))));
        assert!(!state.is_processing);
        assert_eq!(
            state.alert.as_deref(),
            Some("engine error: not enough images")
        );
    }

    #[test]
    fn test_cancel_only_while_running() {
        let (mut state, id) = running();
        assert_eq!(
            state.reduce(ViewAction::CancelPressed),
            Some(Effect::CancelJob(id))
        );
        assert!(!state.is_processing);
        assert!(state.cancel_requested);
        assert_eq!(state.reduce(ViewAction::CancelPressed), Some(Effect::ForceExit));
    }

    #[test]
    fn test_cancel_before_start_does_nothing() {
        let mut state = with_input();
        assert_eq!(state.reduce(ViewAction::CancelPressed), None);
        assert_eq!(state.reduce(ViewAction::CancelPressed), None);
    }

    #[test]
    fn test_summary_uses_titles() {
        let mut state = with_input();
        state.reduce(ViewAction::DetailSelected(Detail::Reduced));
        state.reduce(ViewAction::FormatSelected(OutputFormat::UsdaAndObj));
        state.reduce(ViewAction::SampleOrderingSelected(SampleOrdering::Sequential));
        state.reduce(ViewAction::FeatureSensitivitySelected(FeatureSensitivity::High));
        assert_eq!(
            state.summary(),
            "Reconstructing 24 photos at Reduced detail as USDA + OBJ \
             (Sequential samples, High feature sensitivity)"
        );
    }

    #[test]
    fn test_start_rejection_resets_processing() {
        let mut state = with_input();
        state.reduce(ViewAction::DestinationSelected(Ok(PathBuf::from("/out"))));
        state.reduce(ViewAction::JobStarted(Err(JobError::slot_busy("default"))));
        assert!(!state.is_processing);
        assert!(state.alert.is_some());
        assert_eq!(state.reduce(ViewAction::CancelPressed), None);
    }
}
