use std::thread::JoinHandle;

use crate::{
    control::control_loops::{Routine, RoutineHandle},
    util::error::{AppError, AppResult},
};

const ROUTINE_THREAD_NAME: &str = "position-routine";

/// A routine running on its own thread. Finishing it hands the routine back.
pub struct RoutineThread {
    handle: RoutineHandle,
    join_handle: JoinHandle<Routine>,
}

impl RoutineThread {
    pub fn handle(&self) -> RoutineHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.join_handle.is_finished()
    }

    pub fn finish(self) -> AppResult<Routine> {
        self.handle.finish();
        self.join_handle
            .join()
            .map_err(|_| AppError::ThreadPanicked {
                name: ROUTINE_THREAD_NAME,
            })
    }
}

pub fn spawn_routine_thread(mut routine: Routine, handle: RoutineHandle) -> AppResult<RoutineThread> {
    let join_handle = std::thread::Builder::new()
        .name(ROUTINE_THREAD_NAME.into())
        .spawn(move || {
            routine.main_loop();
            routine
        })
        .map_err(|source| AppError::ThreadSpawn {
            name: ROUTINE_THREAD_NAME,
            source,
        })?;

    Ok(RoutineThread {
        handle,
        join_handle,
    })
}
