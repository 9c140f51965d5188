use std::{sync::Arc, thread::JoinHandle, time::Duration};

use crate::{
    control::control_loops::RoutineHandle,
    shared_core_values::AtomicTelemetry,
    util::error::{AppError, AppResult},
};

/// Logs a telemetry snapshot every `interval` until the routine is asked to finish.
pub fn start_telemetry_thread(
    telemetry_data: Arc<AtomicTelemetry>,
    routine: RoutineHandle,
    interval: Duration,
) -> AppResult<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("telemetry".into())
        .spawn(move || {
            while !routine.is_finished() {
                let snapshot = telemetry_data.snapshot();
                log::info!(
                    "
                        Iteration Time: {:?}us
                        Validity: {:?}
                        Has target: {:?}
                        Joysticks: {:?}
                        Angles: {:?}
                        Virtual scale: {:?}
                        Runtime: {:?} Transmitter: {:?}",
                    snapshot.loop_exec_time_us,
                    snapshot.validity,
                    snapshot.has_target,
                    snapshot.coordinates.joysticks(),
                    snapshot.coordinates.angles(),
                    snapshot.virtual_scale,
                    snapshot.runtime_running,
                    snapshot.transmitter_open,
                );
                std::thread::sleep(interval);
            }
        })
        .map_err(|source| AppError::ThreadSpawn {
            name: "telemetry",
            source,
        })
}
