//! Main drone-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Connect to the drone and start the video stream
//!     - Main loop:
//!         - Operator command processing
//!         - Connection health check
//!         - Line following:
//!             - Frame acquisition
//!             - Line detection
//!             - Motion control processing
//!         - RC demand output
//!     - Stop the drone and land
//!
//! Operator commands come either from the interactive prompt or, if a path is given as the
//! only argument, from a timed script.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod op_processor;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, error, info, warn};
use rustyline::error::ReadlineError;
use std::{
    env,
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
    time::{Duration, Instant},
};

// Internal
use comms_if::cmd::{DroneCmd, RcCmd};
use drone_lib::{
    data_store::{DataStore, SafeModeCause},
    frame_source::{FrameSource, ImageDirSource},
    line_det::{LineDetParams, LineDetector},
    motion_ctrl::InputData,
    op_cmd::OpCmd,
    pilot::{Pilot, PilotParams},
};
use params::DroneExecParams;
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingCmds, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drone_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Tello Line Follower Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: DroneExecParams =
        util::params::load("drone_exec.toml").wrap_err("Could not load exec params")?;
    let pilot_params: PilotParams =
        util::params::load("pilot.toml").wrap_err("Could not load pilot params")?;
    let line_det_params: LineDetParams =
        util::params::load("line_det.toml").wrap_err("Could not load line detection params")?;

    info!("Exec parameters loaded");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let cycles_per_status =
        (exec_params.status_period_s / exec_params.cycle_period_s).round().max(1.0) as u128;

    // ---- INITIALISE OP SOURCE ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let mut op_source = match args.len() {
        // If we have a single argument use it as the script path
        2 => {
            info!("Loading script from \"{}\"", &args[1]);

            let si: ScriptInterpreter<OpCmd> =
                ScriptInterpreter::new(&args[1]).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} commands\n",
                si.get_duration(),
                si.get_num_cmds()
            );

            OpSource::Script(si)
        }
        1 => {
            info!("No script provided, commands will be read from the prompt\n");
            OpSource::Interactive(spawn_prompt().wrap_err("Failed to start the prompt")?)
        }
        n => {
            return Err(eyre!(
                "Expected either zero or one argument, found {}",
                n - 1
            ))
        }
    };

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.motion_ctrl
        .init("motion_ctrl.toml", &session)
        .wrap_err("Failed to initialise MotionCtrl")?;
    info!("MotionCtrl init complete");

    let line_det = LineDetector::new(line_det_params)
        .wrap_err("Failed to initialise the LineDetector")?;
    info!("LineDetector init complete");

    let mut frame_source = match exec_params.frame_dir {
        Some(ref dir) => {
            let s = ImageDirSource::new(dir, exec_params.frame_loop)
                .wrap_err("Failed to open the frame directory")?;
            info!("Playing back {} frames from {:?}", s.len(), dir);
            Some(s)
        }
        None => {
            warn!("No frame source configured, line following is unavailable");
            None
        }
    };

    info!("Module initialisation complete\n");

    // ---- CONNECT TO THE DRONE ----

    let mut pilot = Pilot::start(pilot_params).wrap_err("Failed to start the Pilot")?;

    if !pilot.connect() {
        pilot.shutdown();
        return Err(eyre!("The drone did not respond, is this machine on its WiFi network?"));
    }
    info!("Connected to the drone");

    if let Err(e) = pilot.send_command(&DroneCmd::StreamOn) {
        warn!("Could not start the video stream: {}", e);
    }

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let script_start = Instant::now();

    while !ds.quit {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(cycles_per_status);

        // ---- OPERATOR COMMAND PROCESSING ----

        match op_source {
            OpSource::Script(ref mut si) => {
                match si.get_pending_cmds(script_start.elapsed().as_secs_f64()) {
                    PendingCmds::None => (),
                    PendingCmds::Some(ops) => {
                        for op in ops.iter() {
                            op_processor::exec(&mut ds, &pilot, op, exec_params.speed_step);
                        }
                    }
                    // Exit if end of script reached
                    PendingCmds::EndOfScript => {
                        info!("End of script reached, stopping");
                        break;
                    }
                }
            }
            OpSource::Interactive(ref rx) => loop {
                match rx.try_recv() {
                    Ok(op) => {
                        op_processor::exec(&mut ds, &pilot, &op, exec_params.speed_step);
                        if ds.quit {
                            break;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        warn!("The prompt has closed, stopping");
                        ds.quit = true;
                        break;
                    }
                }
            },
        }

        if ds.quit {
            break;
        }

        // ---- CONNECTION CHECK ----

        if pilot.is_connected() {
            ds.make_unsafe(SafeModeCause::NotConnected).ok();
        } else {
            if !ds.safe {
                error!("Connection to the drone lost");
            }
            ds.make_safe(SafeModeCause::NotConnected);
        }

        // ---- LINE FOLLOWING ----

        if ds.follow_enabled && !ds.safe {
            let now = Instant::now();

            if ds.motion_ctrl.tick_due(now) {
                let frame = frame_source.as_mut().and_then(|s| s.next_frame());

                if let Some(frame) = frame {
                    ds.motion_ctrl_input = Some(InputData {
                        obs: line_det.detect(&frame),
                        time: now,
                    });
                }
            }

            if let Some(ref input) = ds.motion_ctrl_input {
                match ds.motion_ctrl.proc(input) {
                    Ok((rc, r)) => {
                        if rc.is_some() {
                            ds.rc_dem = rc;
                        }
                        ds.motion_ctrl_status_rpt = r;
                    }
                    Err(e) => warn!("Error during MotionCtrl processing: {}", e),
                }
            }
        }

        // ---- RC OUTPUT ----

        if let Some(rc) = ds.rc_dem {
            if let Err(e) = pilot.send_rc_cmd(rc) {
                warn!("Could not send the RC demand: {}", e);
            }
        }

        // ---- STATUS ----

        if ds.is_status_cycle {
            info!("{}", op_processor::status_line(&pilot.tm_state()));

            if ds.follow_enabled {
                let r = &ds.motion_ctrl_status_rpt;
                debug!(
                    "Following: found {}, lost for {} frames, error {:.3}, yaw {:.1}",
                    r.found, r.consec_lost_frames, r.error, r.pid_output
                );
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("Stopping the drone");

    if let Err(e) = pilot.send_rc_cmd(RcCmd::zero()) {
        warn!("Could not zero the RC demand: {}", e);
    }
    if let Err(e) = pilot.land() {
        warn!("Could not land: {}", e);
    }
    if let Err(e) = pilot.send_command(&DroneCmd::StreamOff) {
        warn!("Could not stop the video stream: {}", e);
    }

    pilot.shutdown();

    info!("End of execution");

    Ok(())
}

/// Start the interactive prompt on its own thread.
///
/// Parsed commands are sent down the returned channel. End of input or Ctrl-C sends `quit`.
fn spawn_prompt() -> Result<Receiver<OpCmd>, Report> {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("op_input".into())
        .spawn(move || run_prompt(tx))
        .wrap_err("Failed to start the prompt thread")?;

    Ok(rx)
}

fn run_prompt(tx: Sender<OpCmd>) {
    let mut editor = match rustyline::DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            error!("Could not create the line editor: {}", e);
            tx.send(OpCmd::Quit).ok();
            return;
        }
    };

    loop {
        match editor.readline("drone> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(line.as_str()).ok();

                match line.parse::<OpCmd>() {
                    Ok(op) => {
                        let quit = op == OpCmd::Quit;
                        if tx.send(op).is_err() || quit {
                            break;
                        }
                    }
                    // Usage and help text from structopt
                    Err(e) => println!("{}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                tx.send(OpCmd::Quit).ok();
                break;
            }
            Err(e) => {
                error!("Prompt error: {}", e);
                tx.send(OpCmd::Quit).ok();
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Sources of operator commands.
enum OpSource {
    Interactive(Receiver<OpCmd>),
    Script(ScriptInterpreter<OpCmd>),
}
