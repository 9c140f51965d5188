use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use shared_definitions::{
    extraction::{ExtractionCoordinates, ExtractionResult},
    interpreted::InterpretedTarget,
    layout::PositionSystemDataLayout,
    payload::{DataValidity, DecodedPayload},
    robotics::RoboticsCoordinates,
};

use crate::{
    communication_interfaces::{
        capture::{CaptureBackend, ExternalRuntimeSession, RuntimeStatus},
        tcode::TcodeData,
        transmitter::Transmitter,
    },
    config::{
        constants::{
            FIRST_TICK_DELTA_MS, MAX_TRANSMISSION_DELTA_MS, RUNTIME_RETRY_INTERVAL_MS,
            TICK_BUDGET_MS,
        },
        settings::{ExtractionConfig, ExtractorPreference, RoboticsConfig, RoutineConfig},
    },
    decoding::{
        bits::BitExtractor, interpreter::LightInterpreter, payload_decoder::PayloadDecoder,
    },
    shared_core_values::AtomicTelemetry,
    util::{
        error::{AppError, AppResult},
        time::Stopwatch,
    },
};

use super::{robotics_driver::RoboticsDriver, scale_evaluator::ScaleEvaluator};

/// Work handed to the routine thread. Applied at the start of the next tick, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutineRequest {
    UpdateRoboticsConfig(RoboticsConfig),
    UpdateExtractionConfig(ExtractionConfig),
    SetAutoUpdate(bool),
    /// Target received from outside; capture stays suspended until `ResumeCapture`.
    DirectTarget(InterpretedTarget),
    ResumeCapture,
    OpenTransmitter,
    CloseTransmitter,
    /// Send these coordinates on the next tick even when auto-update is off.
    SubmitCoordinates(RoboticsCoordinates),
}

/// Cloneable way for other threads to reach a running [`Routine`].
#[derive(Debug, Clone)]
pub struct RoutineHandle {
    sender: Sender<RoutineRequest>,
    exit_requested: Arc<AtomicBool>,
}

impl RoutineHandle {
    pub fn send(&self, request: RoutineRequest) -> AppResult<()> {
        self.sender
            .send(request)
            .map_err(|_| AppError::ChannelClosed)
    }

    pub fn finish(&self) {
        self.exit_requested.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.exit_requested.load(Ordering::Acquire)
    }
}

pub struct RoutineCollaborators {
    pub vr_capture: Box<dyn CaptureBackend + Send>,
    pub window_capture: Box<dyn CaptureBackend + Send>,
    pub runtime: Box<dyn ExternalRuntimeSession + Send>,
    pub transmitter: Box<dyn Transmitter + Send>,
}

/// The single threaded capture, decode, drive and transmit loop.
///
/// Only the routine thread touches pipeline state. Everything else talks to it through
/// [`RoutineHandle`] and reads [`AtomicTelemetry`].
pub struct Routine {
    config: RoutineConfig,
    layout: PositionSystemDataLayout,
    collaborators: RoutineCollaborators,
    requests: Receiver<RoutineRequest>,
    exit_requested: Arc<AtomicBool>,
    telemetry: Arc<AtomicTelemetry>,
    stopwatch: Stopwatch,

    bit_extractor: BitExtractor,
    decoder: PayloadDecoder,
    interpreter: LightInterpreter,
    driver: RoboticsDriver,
    scale_evaluator: ScaleEvaluator,

    extracted: ExtractionResult,
    payload: DecodedPayload,
    interpreted: InterpretedTarget,
    coordinates: RoboticsCoordinates,
    raw_tcode: TcodeData,

    is_runtime_running: bool,
    next_runtime_start_ms: u64,
    last_extraction_iteration: Option<u32>,
    direct_target: Option<InterpretedTarget>,
    direct_iteration: u64,
    last_direct_iteration: u64,
    last_tick_ms: Option<u64>,
    last_transmission_ms: Option<u64>,
    tick_count: u64,
}

impl Routine {
    pub fn new(
        config: RoutineConfig,
        collaborators: RoutineCollaborators,
        telemetry: Arc<AtomicTelemetry>,
    ) -> (Self, RoutineHandle) {
        let (sender, requests) = crossbeam_channel::unbounded();
        let exit_requested = Arc::new(AtomicBool::new(false));
        let layout = PositionSystemDataLayout::standard();

        let routine = Routine {
            config,
            layout,
            collaborators,
            requests,
            exit_requested: exit_requested.clone(),
            telemetry,
            stopwatch: Stopwatch::start_new(),
            bit_extractor: BitExtractor::new(layout, config.extraction.threshold_policy),
            decoder: PayloadDecoder::new(),
            interpreter: LightInterpreter::new(),
            driver: RoboticsDriver::new(config.robotics),
            scale_evaluator: ScaleEvaluator::new(),
            extracted: ExtractionResult::failed(),
            payload: DecodedPayload::new(),
            interpreted: InterpretedTarget::none(),
            coordinates: RoboticsCoordinates::default(),
            raw_tcode: TcodeData::default(),
            is_runtime_running: false,
            next_runtime_start_ms: 0,
            last_extraction_iteration: None,
            direct_target: None,
            direct_iteration: 0,
            last_direct_iteration: 0,
            last_tick_ms: None,
            last_transmission_ms: None,
            tick_count: 0,
        };
        let handle = RoutineHandle {
            sender,
            exit_requested,
        };
        (routine, handle)
    }

    pub fn config(&self) -> &RoutineConfig {
        &self.config
    }

    pub fn payload(&self) -> &DecodedPayload {
        &self.payload
    }

    pub fn interpreted(&self) -> &InterpretedTarget {
        &self.interpreted
    }

    pub fn coordinates(&self) -> RoboticsCoordinates {
        self.coordinates
    }

    pub fn raw_tcode(&self) -> TcodeData {
        self.raw_tcode
    }

    pub fn bits(&self) -> &[bool] {
        self.bit_extractor.bits()
    }

    pub fn extracted(&self) -> &ExtractionResult {
        &self.extracted
    }

    pub fn virtual_scale(&self) -> f32 {
        self.scale_evaluator.virtual_scale()
    }

    pub fn is_runtime_running(&self) -> bool {
        self.is_runtime_running
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Runs ticks, padding each to the tick budget, until the exit flag is raised.
    pub fn main_loop(&mut self) {
        let tick_budget = Duration::from_millis(TICK_BUDGET_MS);
        log::info!("Routine started");

        while !self.exit_requested.load(Ordering::Acquire) {
            let tick_started = Instant::now();
            self.tick();

            let elapsed = tick_started.elapsed();
            if elapsed < tick_budget {
                thread::sleep(tick_budget - elapsed);
            }
        }

        log::info!("Routine finished after {} ticks", self.tick_count);
    }

    /// One pass of the pipeline. Never sleeps.
    pub fn tick(&mut self) {
        let now_ms = self.stopwatch.elapsed_ms();
        self.tick_at(now_ms);
    }

    /// Same as [`Routine::tick`] with the pipeline clock supplied by the caller, for replays
    /// and hosts that pace the routine themselves. `now_ms` must not go backwards.
    pub fn tick_at(&mut self, now_ms: u64) {
        let tick_started_us = self.stopwatch.elapsed_us();

        self.process_requests();
        self.handle_runtime(now_ms);

        if self.direct_target.is_some() {
            self.process_direct_target();
        } else {
            self.process_capture();
        }
        self.evaluate_scale(now_ms);

        let delta_time_ms = match self.last_tick_ms {
            Some(last_tick_ms) => now_ms.saturating_sub(last_tick_ms),
            None => FIRST_TICK_DELTA_MS,
        };
        self.last_tick_ms = Some(now_ms);

        self.coordinates = self.driver.get_coordinates(delta_time_ms);
        self.submit(now_ms);

        self.tick_count += 1;
        let loop_exec_time_us = self.stopwatch.elapsed_us().saturating_sub(tick_started_us);
        self.publish_telemetry(loop_exec_time_us);
    }

    fn process_requests(&mut self) {
        loop {
            match self.requests.try_recv() {
                Ok(request) => self.apply_request(request),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn apply_request(&mut self, request: RoutineRequest) {
        let transmitter = &mut self.collaborators.transmitter;
        match request {
            RoutineRequest::UpdateRoboticsConfig(robotics) => {
                log::info!("Robotics configuration updated");
                self.driver.update_configuration(robotics);
                self.config.robotics = *self.driver.config();
            }
            RoutineRequest::UpdateExtractionConfig(extraction) => {
                log::info!("Extraction configuration updated");
                self.bit_extractor
                    .set_threshold_policy(extraction.threshold_policy);
                self.config.extraction = extraction;
            }
            RoutineRequest::SetAutoUpdate(auto_update) => {
                self.config.auto_update = auto_update;
            }
            RoutineRequest::DirectTarget(target) => {
                if self.direct_target.is_none() {
                    log::info!("Direct targets received, capture suspended");
                }
                self.direct_target = Some(target);
                self.direct_iteration += 1;
            }
            RoutineRequest::ResumeCapture => {
                self.direct_target = None;
                self.last_extraction_iteration = None;
            }
            RoutineRequest::OpenTransmitter => {
                if let Err(error) = transmitter.open() {
                    log::error!("Could not open transmitter: {}", error);
                }
                self.last_transmission_ms = None;
            }
            RoutineRequest::CloseTransmitter => transmitter.close(),
            RoutineRequest::SubmitCoordinates(coordinates) => {
                if transmitter.is_open() {
                    self.raw_tcode = TcodeData::from_coordinates(&coordinates);
                    transmitter.provide_new_target(&coordinates);
                }
            }
        }
    }

    fn handle_runtime(&mut self, now_ms: u64) {
        let runtime = &mut self.collaborators.runtime;
        if self.is_runtime_running {
            if runtime.poll_events() == RuntimeStatus::Exited {
                log::info!("External runtime exited");
                self.is_runtime_running = false;
            }
        } else if now_ms >= self.next_runtime_start_ms {
            self.next_runtime_start_ms = now_ms + RUNTIME_RETRY_INTERVAL_MS;
            self.is_runtime_running = runtime.try_start();
            if self.is_runtime_running {
                log::info!("External runtime connected");
            }
        }
    }

    fn process_capture(&mut self) {
        let use_vr = self.config.extraction.preference == ExtractorPreference::PrioritizeVr
            && self.is_runtime_running;
        let (backend, template) = if use_vr {
            (
                &mut self.collaborators.vr_capture,
                self.config.extraction.vr_coordinates,
            )
        } else {
            (
                &mut self.collaborators.window_capture,
                self.config.extraction.window_coordinates,
            )
        };

        let (requested_width, requested_height) = self.layout.scaled_size(backend.scale_factor());
        let coordinates = ExtractionCoordinates {
            requested_width,
            requested_height,
            ..template
        };

        let result = backend.extract(&coordinates);
        if result.success {
            self.extracted = result;
        }

        if self.extracted.success
            && self.last_extraction_iteration != Some(self.extracted.iteration)
        {
            self.last_extraction_iteration = Some(self.extracted.iteration);
            self.process_extracted();
        }
    }

    fn process_extracted(&mut self) {
        let bits = self.bit_extractor.extract_bits(
            &self.extracted.monochromatic_data,
            self.extracted.width,
            self.extracted.height,
        );
        self.decoder.decode_into(&mut self.payload, bits);

        if self.payload.validity == DataValidity::Ok {
            self.interpreted = self.interpreter.interpret(&self.payload);
            self.driver.provide_target(&self.interpreted);
        } else {
            self.driver.mark_data_failure();
        }
    }

    fn process_direct_target(&mut self) {
        if self.direct_iteration == self.last_direct_iteration {
            return;
        }
        self.last_direct_iteration = self.direct_iteration;

        if let Some(target) = self.direct_target {
            self.interpreted = target;
            self.driver.provide_target(&self.interpreted);
        }
    }

    fn evaluate_scale(&mut self, now_ms: u64) {
        if !self.is_runtime_running
            || self.payload.validity != DataValidity::Ok
            || !self.payload.has_camera_pose()
        {
            return;
        }
        if let Some(hmd_position) = self.collaborators.runtime.hmd_position() {
            self.scale_evaluator
                .evaluate(now_ms, hmd_position, self.payload.camera_position);
        }
    }

    fn submit(&mut self, now_ms: u64) {
        let transmitter = &mut self.collaborators.transmitter;
        if !transmitter.is_open() {
            return;
        }

        if self.config.auto_update {
            self.raw_tcode = TcodeData::from_coordinates(&self.coordinates);
            transmitter.provide_new_target(&self.coordinates);
        }

        let elapsed_ms = match self.last_transmission_ms {
            Some(last_transmission_ms) => now_ms
                .saturating_sub(last_transmission_ms)
                .min(MAX_TRANSMISSION_DELTA_MS),
            None => FIRST_TICK_DELTA_MS,
        };
        transmitter.update(elapsed_ms);
        self.last_transmission_ms = Some(now_ms);
    }

    fn publish_telemetry(&self, loop_exec_time_us: u64) {
        let telemetry = &self.telemetry;
        telemetry
            .loop_exec_time_us
            .store(loop_exec_time_us, Ordering::Relaxed);
        telemetry.store_validity(self.payload.validity);
        telemetry
            .has_target
            .store(self.interpreted.has_target, Ordering::Relaxed);
        telemetry.coordinates.store(&self.coordinates);
        telemetry.virtual_scale.store(self.virtual_scale());
        telemetry
            .runtime_running
            .store(self.is_runtime_running, Ordering::Relaxed);
        telemetry
            .transmitter_open
            .store(self.collaborators.transmitter.is_open(), Ordering::Relaxed);
        telemetry.tick_count.store(self.tick_count, Ordering::Relaxed);
    }
}
