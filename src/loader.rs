//! Background stage building
//!
//! Feature extraction and stage generation run on a worker thread so the
//! host can keep animating a loading scene. The loader is polled: progress
//! strings stream over one channel, the single build outcome over another.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::features::AudioFeatures;
use crate::seed::stage_seed;
use crate::stage::builder::{BuildError, BuilderOptions, BuiltStage, StageGeometryBuilder};

/// Everything needed to assemble a [`crate::stage::Stage`]
#[derive(Debug)]
pub struct LoadedStage {
    pub seed: u64,
    /// RNG mid-stream after generation; the stage keeps drawing from it
    pub rng: Pcg32,
    pub built: BuiltStage,
    pub features: AudioFeatures,
}

/// Handle to an in-flight background build
pub struct StageLoader {
    progress: Receiver<String>,
    result: Receiver<Result<LoadedStage, BuildError>>,
    finished: bool,
}

impl StageLoader {
    /// Start a build on a worker thread. `extract` is the external onset
    /// detector, handed the raw decoded sample bytes.
    pub fn spawn<F>(sample_bytes: Vec<u8>, extract: F, options: BuilderOptions) -> Self
    where
        F: FnOnce(&[u8]) -> AudioFeatures + Send + 'static,
    {
        let (progress_tx, progress) = mpsc::channel();
        let (result_tx, result) = mpsc::channel();

        thread::spawn(move || {
            // The host may have dropped the loader; send failures just end
            // the worker early.
            let _ = progress_tx.send("Hashing audio".to_string());
            let seed = stage_seed(&sample_bytes);
            let mut rng = Pcg32::seed_from_u64(seed);

            let _ = progress_tx.send("Detecting beats".to_string());
            let features = extract(&sample_bytes);

            let _ = progress_tx.send("Building stage geometry".to_string());
            let outcome = StageGeometryBuilder::build(&features, &mut rng, &options).map(|built| {
                LoadedStage {
                    seed,
                    rng,
                    built,
                    features,
                }
            });
            let _ = result_tx.send(outcome);
        });

        Self {
            progress,
            result,
            finished: false,
        }
    }

    /// Drain progress messages received since the last poll
    pub fn progress_messages(&self) -> Vec<String> {
        self.progress.try_iter().collect()
    }

    /// Non-blocking check for the build outcome; yields `Some` exactly once
    pub fn poll(&mut self) -> Option<Result<LoadedStage, BuildError>> {
        if self.finished {
            return None;
        }
        match self.result.try_recv() {
            Ok(outcome) => {
                self.finished = true;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                // Worker panicked before sending an outcome.
                log::error!("stage build worker exited without a result");
                self.finished = true;
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Segment;
    use std::time::Duration;

    fn wait_for(loader: &mut StageLoader) -> Result<LoadedStage, BuildError> {
        for _ in 0..500 {
            if let Some(outcome) = loader.poll() {
                return outcome;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("build did not finish in time");
    }

    #[test]
    fn test_background_build_succeeds() {
        let bytes = vec![7u8; 2048];
        let expected_seed = stage_seed(&bytes);
        let mut loader = StageLoader::spawn(
            bytes,
            |_| AudioFeatures::new(vec![0.5, 1.0, 2.0], vec![Segment::new(1, 0.0, 0.0)]),
            BuilderOptions::default(),
        );
        let loaded = wait_for(&mut loader).unwrap();
        assert_eq!(loaded.seed, expected_seed);
        assert_eq!(loaded.built.hazards.len(), 3);
        assert!(loader.is_finished());
        assert!(loader.poll().is_none());
    }

    #[test]
    fn test_progress_messages_arrive_in_order() {
        let mut loader = StageLoader::spawn(
            vec![0u8; 64],
            |_| AudioFeatures::new(vec![0.5], vec![Segment::new(1, 0.0, 0.0)]),
            BuilderOptions::default(),
        );
        wait_for(&mut loader).unwrap();
        let messages = loader.progress_messages();
        assert_eq!(
            messages,
            vec![
                "Hashing audio".to_string(),
                "Detecting beats".to_string(),
                "Building stage geometry".to_string(),
            ]
        );
    }

    #[test]
    fn test_build_error_reaches_the_poller() {
        let mut loader = StageLoader::spawn(
            vec![0u8; 64],
            |_| AudioFeatures::new(vec![], vec![Segment::new(1, 0.0, 0.0)]),
            BuilderOptions::default(),
        );
        let outcome = wait_for(&mut loader);
        assert_eq!(outcome.unwrap_err(), BuildError::NoOnsets);
    }
}
