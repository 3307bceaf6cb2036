use spacetimedb::{
    ReducerContext, Identity, Table, Timestamp, ScheduleAt,
    table, reducer, rand::Rng,
};
use std::time::Duration;

pub mod config;
pub mod engine;
pub mod pointer;
pub mod roster;
pub mod sampler;
pub mod segments;
pub mod spin;

// Bulk import of rosters saved by the offline (browser storage) picker
mod import;

pub use config::WheelConfig;
pub use engine::{SpinRejection, SpinStart, TickOutcome, WheelDisplay, WheelEngine, WinnerSet};
pub use roster::{LocalRoster, Participant, RegistrationError, RosterProvider};
pub use segments::Segment;

use roster::{normalize_name, same_name};

// ==================== CONSTANTS ====================

/// Session codes avoid confusing glyphs (no I, O, 0, 1)
const SESSION_CODE_CHARS: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const SESSION_CODE_LEN: usize = 6;

/// Presenter-chosen codes are free text up to this length
const MAX_SESSION_CODE_CHARS: usize = 64;

/// Sessions untouched for this long are deleted by the cleanup task
const STALE_SESSION_SECS: u64 = 24 * 60 * 60;
const CLEANUP_INTERVAL_SECS: u64 = 60 * 60;

/// Singleton row id in picker_config
const CONFIG_ID: u32 = 0;

// ==================== HELPER FUNCTIONS ====================

/// Milliseconds since the epoch, the engine's clock unit
fn timestamp_ms(ts: Timestamp) -> u64 {
    (ts.to_micros_since_unix_epoch().max(0) / 1000) as u64
}

fn ms_timestamp(ms: u64) -> Timestamp {
    Timestamp::from_micros_since_unix_epoch((ms as i64).saturating_mul(1000))
}

/// Draw a fresh session code
fn random_session_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let chars: Vec<char> = SESSION_CODE_CHARS.chars().collect();
    (0..SESSION_CODE_LEN)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect()
}

/// Trim and bound a presenter-supplied code
fn normalize_session_code(raw: &str) -> Result<String, String> {
    let code = raw.trim();
    if code.is_empty() {
        return Err("Please enter a session code.".to_string());
    }
    if code.chars().count() > MAX_SESSION_CODE_CHARS {
        return Err(format!("Session code is too long (at most {} characters).", MAX_SESSION_CODE_CHARS));
    }
    Ok(code.to_string())
}

/// Look up a session by code (surrounding whitespace ignored)
pub(crate) fn find_session(ctx: &ReducerContext, raw_code: &str) -> Result<PickerSession, String> {
    let code = raw_code.trim().to_string();
    ctx.db.picker_session()
        .code()
        .find(&code)
        .ok_or("Session not found. Please check the session code and try again.".to_string())
}

/// Mark a session as in use so the cleanup task leaves it alone
pub(crate) fn touch_session(ctx: &ReducerContext, mut session: PickerSession) {
    session.last_active_at = ctx.timestamp;
    ctx.db.picker_session().code().update(session);
}

/// Current roster of a session in registration order
pub(crate) fn session_participants(ctx: &ReducerContext, session_code: &str) -> Vec<Participant> {
    let mut rows: Vec<Registration> = ctx.db.registration()
        .session_code()
        .filter(&session_code.to_string())
        .collect();
    rows.sort_by_key(|r| r.id);
    rows.into_iter()
        .map(|r| Participant { id: r.id, name: r.name, registered_at: r.registered_at })
        .collect()
}

fn load_config(ctx: &ReducerContext) -> WheelConfig {
    ctx.db.picker_config()
        .id()
        .find(&CONFIG_ID)
        .map(|c| c.wheel)
        .unwrap_or_default()
}

fn load_wheel(ctx: &ReducerContext, session_code: &str) -> Result<Wheel, String> {
    ctx.db.wheel()
        .session_code()
        .find(&session_code.to_string())
        .ok_or(format!("Wheel for session {} not found", session_code))
}

fn save_wheel(ctx: &ReducerContext, wheel: Wheel) {
    ctx.db.wheel().session_code().update(wheel);
}

fn cancel_spin_ticks(ctx: &ReducerContext, session_code: &str) {
    let ids: Vec<u64> = ctx.db.spin_tick_schedule()
        .session_code()
        .filter(&session_code.to_string())
        .map(|s| s.id)
        .collect();
    for id in ids {
        ctx.db.spin_tick_schedule().id().delete(&id);
    }
}

fn cancel_settle(ctx: &ReducerContext, session_code: &str) {
    let ids: Vec<u64> = ctx.db.settle_schedule()
        .session_code()
        .filter(&session_code.to_string())
        .map(|s| s.id)
        .collect();
    for id in ids {
        ctx.db.settle_schedule().id().delete(&id);
    }
}

fn schedule_spin_ticks(ctx: &ReducerContext, session_code: &str, config: &WheelConfig) {
    cancel_spin_ticks(ctx, session_code);
    ctx.db.spin_tick_schedule().insert(SpinTickSchedule {
        id: 0, // auto_inc
        session_code: session_code.to_string(),
        scheduled_at: ScheduleAt::Interval(Duration::from_millis(config.tick_interval_ms as u64).into()),
    });
}

fn schedule_settle(ctx: &ReducerContext, session_code: &str, settle_at_ms: u64) {
    cancel_settle(ctx, session_code);
    ctx.db.settle_schedule().insert(SettleSchedule {
        id: 0, // auto_inc
        session_code: session_code.to_string(),
        scheduled_at: ScheduleAt::Time(ms_timestamp(settle_at_ms).into()),
    });
}

fn clear_winners(ctx: &ReducerContext, session_code: &str) -> usize {
    let ids: Vec<u64> = ctx.db.winner()
        .session_code()
        .filter(&session_code.to_string())
        .map(|w| w.id)
        .collect();
    for id in &ids {
        ctx.db.winner().id().delete(id);
    }
    ids.len()
}

/// Winner rows for one draw, position 1 being the wheel's pick
fn winner_rows(session_code: &str, winners: &WinnerSet, drawn_at: Timestamp) -> Vec<Winner> {
    winners
        .iter()
        .enumerate()
        .map(|(i, p)| Winner {
            id: 0, // auto_inc
            session_code: session_code.to_string(),
            position: i as u32 + 1,
            participant_id: p.id,
            name: p.name.clone(),
            drawn_at,
        })
        .collect()
}

fn write_frame(ctx: &ReducerContext, session_code: &str, angle: f64, segments: Vec<Segment>, is_spinning: bool) {
    let frame = WheelFrame {
        session_code: session_code.to_string(),
        angle,
        is_spinning,
        segments,
        updated_at: ctx.timestamp,
    };
    if ctx.db.wheel_frame().session_code().find(&frame.session_code).is_some() {
        ctx.db.wheel_frame().session_code().update(frame);
    } else {
        ctx.db.wheel_frame().insert(frame);
    }
}

/// Remove a session and everything hanging off it
fn delete_session_data(ctx: &ReducerContext, session_code: &str) {
    let code = session_code.to_string();

    cancel_spin_ticks(ctx, &code);
    cancel_settle(ctx, &code);
    clear_winners(ctx, &code);

    let registration_ids: Vec<u64> = ctx.db.registration()
        .session_code()
        .filter(&code)
        .map(|r| r.id)
        .collect();
    for id in registration_ids {
        ctx.db.registration().id().delete(&id);
    }

    ctx.db.wheel_frame().session_code().delete(&code);
    ctx.db.wheel().session_code().delete(&code);
    ctx.db.picker_session().code().delete(&code);
}

/// Insert a session with an idle wheel and an empty frame
fn create_session_rows(ctx: &ReducerContext, code: &str) {
    ctx.db.picker_session().insert(PickerSession {
        code: code.to_string(),
        created_by: ctx.sender,
        created_at: ctx.timestamp,
        last_active_at: ctx.timestamp,
    });
    ctx.db.wheel().insert(Wheel {
        session_code: code.to_string(),
        engine: WheelEngine::new(),
    });
    write_frame(ctx, code, 0.0, Vec::new(), false);
}

// ==================== ROSTER & DISPLAY COLLABORATORS ====================

/// Realtime roster: reads the registration table for one session
pub struct SessionRoster<'a> {
    ctx: &'a ReducerContext,
    session_code: String,
}

impl<'a> SessionRoster<'a> {
    pub fn new(ctx: &'a ReducerContext, session_code: &str) -> Self {
        Self { ctx, session_code: session_code.to_string() }
    }
}

impl RosterProvider for SessionRoster<'_> {
    fn roster(&self) -> Vec<Participant> {
        session_participants(self.ctx, &self.session_code)
    }
}

/// Buffers what the engine wants shown so it can be written once per reducer
#[derive(Debug, Default)]
pub struct SessionDisplay {
    frame: Option<(f64, Vec<Segment>)>,
    winners: Option<WinnerSet>,
}

impl WheelDisplay for SessionDisplay {
    fn on_frame(&mut self, angle: f64, segments: &[Segment]) {
        // Only the latest frame matters
        self.frame = Some((angle, segments.to_vec()));
    }

    fn on_result(&mut self, winners: &WinnerSet) {
        self.winners = Some(winners.clone());
    }
}

impl SessionDisplay {
    /// Write the buffered frame and winners to the public tables
    fn flush(self, ctx: &ReducerContext, session_code: &str, is_spinning: bool) {
        if let Some((angle, segments)) = self.frame {
            write_frame(ctx, session_code, angle, segments, is_spinning);
        }
        if let Some(winners) = self.winners {
            clear_winners(ctx, session_code);
            for row in winner_rows(session_code, &winners, ctx.timestamp) {
                ctx.db.winner().insert(row);
            }
        }
    }
}

// ==================== TABLES ====================

/// A picker session, joined by students via its code
#[table(name = picker_session, public)]
pub struct PickerSession {
    #[primary_key]
    pub code: String,

    /// Presenter connection that opened the session
    pub created_by: Identity,

    pub created_at: Timestamp,

    /// Bumped by every roster or wheel change; drives stale cleanup
    pub last_active_at: Timestamp,
}

/// One registered student in one session
#[table(name = registration, public)]
#[derive(Clone)]
pub struct Registration {
    /// Monotonic, so ordering by id is registration order (= wheel order)
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    #[index(btree)]
    pub session_code: String,

    pub name: String,

    pub registered_at: Timestamp,
}

/// Engine state per session, persisted between reducer calls.
/// PRIVATE: clients read wheel_frame and winner instead
#[table(name = wheel)]
pub struct Wheel {
    #[primary_key]
    pub session_code: String,

    pub engine: WheelEngine,
}

/// What the wheel looks like right now (rewritten every tick while spinning)
#[table(name = wheel_frame, public)]
pub struct WheelFrame {
    #[primary_key]
    pub session_code: String,

    /// Rotation in radians, clockwise in screen space
    pub angle: f64,

    pub is_spinning: bool,

    /// Slices in roster order, unrotated
    pub segments: Vec<Segment>,

    pub updated_at: Timestamp,
}

/// Winners of the latest spin for a session
#[table(name = winner, public)]
pub struct Winner {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    #[index(btree)]
    pub session_code: String,

    /// 1-based; position 1 is the participant under the pointer
    pub position: u32,

    pub participant_id: u64,

    /// Denormalized so results survive the participant being removed
    pub name: String,

    pub drawn_at: Timestamp,
}

/// Module-wide wheel tunables (single row, id 0)
#[table(name = picker_config)]
pub struct PickerConfig {
    #[primary_key]
    pub id: u32,

    pub wheel: WheelConfig,
}

/// Identities allowed to change module configuration
#[table(name = authorized_worker)]
pub struct AuthorizedWorker {
    #[primary_key]
    pub identity: Identity,
}

/// Animation loop for a spinning wheel (interval, removed on landing)
#[table(name = spin_tick_schedule, scheduled(spin_tick))]
pub struct SpinTickSchedule {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    #[index(btree)]
    pub session_code: String,

    pub scheduled_at: ScheduleAt,
}

/// Fires once the settle delay after landing has passed
#[table(name = settle_schedule, scheduled(settle_spin))]
pub struct SettleSchedule {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    #[index(btree)]
    pub session_code: String,

    pub scheduled_at: ScheduleAt,
}

/// Schedule table for stale session cleanup
#[table(name = cleanup_schedule, scheduled(cleanup_stale_sessions))]
pub struct CleanupSchedule {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    pub scheduled_at: ScheduleAt,
}

// ==================== REDUCERS ====================

/// Initialize module - config row, owner authorization, cleanup schedule
#[reducer(init)]
pub fn init(ctx: &ReducerContext) {
    // In init, ctx.sender is the module owner identity
    if ctx.db.authorized_worker().identity().find(&ctx.sender).is_none() {
        ctx.db.authorized_worker().insert(AuthorizedWorker {
            identity: ctx.sender,
        });
    }

    if ctx.db.picker_config().id().find(&CONFIG_ID).is_none() {
        ctx.db.picker_config().insert(PickerConfig {
            id: CONFIG_ID,
            wheel: WheelConfig::default(),
        });
    }

    // Avoid duplicate schedulers on hot-reload
    if ctx.db.cleanup_schedule().iter().count() == 0 {
        ctx.db.cleanup_schedule().insert(CleanupSchedule {
            id: 0, // auto_inc
            scheduled_at: ScheduleAt::Interval(Duration::from_secs(CLEANUP_INTERVAL_SECS).into()),
        });
    }

    log::info!("Student picker module initialized");
}

/// Replace the wheel tunables (authorized workers only)
#[reducer]
pub fn set_wheel_config(ctx: &ReducerContext, wheel: WheelConfig) -> Result<(), String> {
    if ctx.db.authorized_worker().identity().find(&ctx.sender).is_none() {
        log::warn!("Unauthorized set_wheel_config attempt by {}", ctx.sender);
        return Err("Unauthorized".to_string());
    }

    wheel.validate()?;

    log::info!("[CONFIG] duration_ms:{}-{} turns:{}-{} settle_ms:{} tick_ms:{}",
        wheel.min_duration_ms, wheel.max_duration_ms, wheel.min_turns, wheel.max_turns,
        wheel.settle_delay_ms, wheel.tick_interval_ms);

    let row = PickerConfig { id: CONFIG_ID, wheel };
    if ctx.db.picker_config().id().find(&CONFIG_ID).is_some() {
        ctx.db.picker_config().id().update(row);
    } else {
        ctx.db.picker_config().insert(row);
    }
    Ok(())
}

/// Open a new session under a generated code
#[reducer]
pub fn create_session(ctx: &ReducerContext) -> Result<(), String> {
    let mut rng = ctx.rng();
    let mut code = random_session_code(&mut rng);

    // 32^6 codes; re-draw on the rare collision
    while ctx.db.picker_session().code().find(&code).is_some() {
        code = random_session_code(&mut rng);
    }

    create_session_rows(ctx, &code);
    log::info!("[SESSION] created code:{} by:{}", code, ctx.sender);
    Ok(())
}

/// Open (or reconnect to) a session under a presenter-chosen code
#[reducer]
pub fn open_session(ctx: &ReducerContext, code: String) -> Result<(), String> {
    let code = normalize_session_code(&code)?;

    if let Some(existing) = ctx.db.picker_session().code().find(&code) {
        touch_session(ctx, existing);
        log::info!("[SESSION] reconnected code:{} by:{}", code, ctx.sender);
        return Ok(());
    }

    create_session_rows(ctx, &code);
    log::info!("[SESSION] opened code:{} by:{}", code, ctx.sender);
    Ok(())
}

/// End a session and drop its roster, wheel and results
#[reducer]
pub fn close_session(ctx: &ReducerContext, session_code: String) -> Result<(), String> {
    let session = find_session(ctx, &session_code)?;
    let participants = session_participants(ctx, &session.code).len();
    delete_session_data(ctx, &session.code);
    log::info!("[SESSION] closed code:{} participants:{}", session.code, participants);
    Ok(())
}

/// Student joins a session's roster
#[reducer]
pub fn register_participant(ctx: &ReducerContext, session_code: String, name: String) -> Result<(), String> {
    let session = find_session(ctx, &session_code)?;
    let name = normalize_name(&name).map_err(|e| e.to_string())?;

    if session_participants(ctx, &session.code).iter().any(|p| same_name(&p.name, &name)) {
        log::warn!("[ROSTER] duplicate name \"{}\" in session:{}", name, session.code);
        return Err(RegistrationError::DuplicateName(name).to_string());
    }

    let registration = ctx.db.registration().insert(Registration {
        id: 0, // auto_inc
        session_code: session.code.clone(),
        name,
        registered_at: ctx.timestamp,
    });

    log::info!("[ROSTER] registered session:{} id:{} name:\"{}\"", session.code, registration.id, registration.name);
    touch_session(ctx, session);
    Ok(())
}

/// Presenter removes one participant
#[reducer]
pub fn remove_participant(ctx: &ReducerContext, session_code: String, participant_id: u64) -> Result<(), String> {
    let session = find_session(ctx, &session_code)?;

    let registration = ctx.db.registration()
        .id()
        .find(&participant_id)
        .filter(|r| r.session_code == session.code)
        .ok_or(RegistrationError::UnknownParticipant(participant_id).to_string())?;

    ctx.db.registration().id().delete(&participant_id);
    log::info!("[ROSTER] removed session:{} id:{} name:\"{}\"", session.code, participant_id, registration.name);
    touch_session(ctx, session);
    Ok(())
}

/// Presenter removes everyone. A spin in flight keeps its own snapshot.
#[reducer]
pub fn clear_participants(ctx: &ReducerContext, session_code: String) -> Result<(), String> {
    let session = find_session(ctx, &session_code)?;

    let ids: Vec<u64> = ctx.db.registration()
        .session_code()
        .filter(&session.code)
        .map(|r| r.id)
        .collect();

    if ids.is_empty() {
        return Err("No participants to clear.".to_string());
    }

    for id in &ids {
        ctx.db.registration().id().delete(id);
    }

    log::info!("[ROSTER] cleared session:{} removed:{}", session.code, ids.len());
    touch_session(ctx, session);
    Ok(())
}

/// Snapshot the roster and start the wheel for `winner_count` winners.
/// A wheel that is already spinning (or settling) ignores the request.
#[reducer]
pub fn start_spin(ctx: &ReducerContext, session_code: String, winner_count: u32) -> Result<(), String> {
    let session = find_session(ctx, &session_code)?;
    let mut wheel = load_wheel(ctx, &session.code)?;
    let config = load_config(ctx);
    let roster = SessionRoster::new(ctx, &session.code);
    let mut rng = ctx.rng();

    match wheel.engine.start_spin(&roster, winner_count, timestamp_ms(ctx.timestamp), &config, &mut rng) {
        Ok(SpinStart::Started { duration_ms, target_angle }) => {
            let mut display = SessionDisplay::default();
            wheel.engine.render(&mut display);
            let roster_size = wheel.engine.snapshot().map(|s| s.len()).unwrap_or(0);

            // Previous results disappear when a new pick begins
            clear_winners(ctx, &session.code);
            display.flush(ctx, &session.code, true);
            save_wheel(ctx, wheel);
            schedule_spin_ticks(ctx, &session.code, &config);

            log::info!("[SPIN] started session:{} roster:{} winners:{} duration_ms:{:.0} target:{:.3}",
                session.code, roster_size, winner_count, duration_ms, target_angle);
            touch_session(ctx, session);
            Ok(())
        }
        Ok(SpinStart::Ignored) => {
            log::debug!("[SPIN] ignored start for busy wheel session:{}", session.code);
            Ok(())
        }
        Err(rejection) => {
            log::warn!("[SPIN] rejected session:{} winners:{} reason:{:?}", session.code, winner_count, rejection);
            Err(rejection.to_string())
        }
    }
}

/// Animation tick (scheduled reducer)
#[reducer]
pub fn spin_tick(ctx: &ReducerContext, schedule: SpinTickSchedule) {
    // Only allow scheduler to call this, not clients
    if ctx.sender != ctx.identity() {
        log::warn!("Client {} attempted to call spin_tick", ctx.sender);
        return;
    }

    let mut wheel = match load_wheel(ctx, &schedule.session_code) {
        Ok(w) => w,
        Err(e) => {
            log::warn!("[SPIN] tick for missing wheel: {}", e);
            ctx.db.spin_tick_schedule().id().delete(&schedule.id);
            return;
        }
    };

    let config = load_config(ctx);
    let now = timestamp_ms(ctx.timestamp);
    let mut display = SessionDisplay::default();

    match wheel.engine.tick(now, &config, &mut display) {
        TickOutcome::Spinning { progress } => {
            log::debug!("[SPIN] tick session:{} progress:{:.3}", schedule.session_code, progress);
            display.flush(ctx, &schedule.session_code, true);
            save_wheel(ctx, wheel);
        }
        TickOutcome::Landed { settle_at_ms } => {
            cancel_spin_ticks(ctx, &schedule.session_code);
            schedule_settle(ctx, &schedule.session_code, settle_at_ms);
            display.flush(ctx, &schedule.session_code, false);
            log::info!("[SPIN] landed session:{} angle:{:.3}", schedule.session_code, wheel.engine.current_angle());
            save_wheel(ctx, wheel);
        }
        TickOutcome::Settling { .. } | TickOutcome::Idle => {
            // Leftover interval from a spin that already landed
            ctx.db.spin_tick_schedule().id().delete(&schedule.id);
        }
    }
}

/// Stop button: land immediately on the pre-chosen target angle.
/// No-op unless the wheel is spinning.
#[reducer]
pub fn force_stop(ctx: &ReducerContext, session_code: String) -> Result<(), String> {
    let session = find_session(ctx, &session_code)?;
    let mut wheel = load_wheel(ctx, &session.code)?;
    let config = load_config(ctx);
    let mut display = SessionDisplay::default();

    match wheel.engine.force_stop(timestamp_ms(ctx.timestamp), &config, &mut display) {
        Some(settle_at_ms) => {
            cancel_spin_ticks(ctx, &session.code);
            schedule_settle(ctx, &session.code, settle_at_ms);
            display.flush(ctx, &session.code, false);
            log::info!("[SPIN] force stopped session:{} angle:{:.3}", session.code, wheel.engine.current_angle());
            save_wheel(ctx, wheel);
            touch_session(ctx, session);
        }
        None => {
            log::debug!("[SPIN] force_stop ignored, wheel not spinning session:{}", session.code);
        }
    }
    Ok(())
}

/// Settle delay elapsed - resolve the pointer and draw winners (scheduled reducer)
#[reducer]
pub fn settle_spin(ctx: &ReducerContext, schedule: SettleSchedule) {
    // Only allow scheduler to call this, not clients
    if ctx.sender != ctx.identity() {
        log::warn!("Client {} attempted to call settle_spin", ctx.sender);
        return;
    }

    match load_wheel(ctx, &schedule.session_code) {
        Ok(mut wheel) => {
            let mut rng = ctx.rng();
            let mut display = SessionDisplay::default();

            match wheel.engine.settle(&mut rng, &mut display) {
                Some(winners) => {
                    let names: Vec<&str> = winners.iter().map(|p| p.name.as_str()).collect();
                    log::info!("[SPIN] winners session:{} count:{} names:{:?}",
                        schedule.session_code, winners.len(), names);
                    display.flush(ctx, &schedule.session_code, false);
                    save_wheel(ctx, wheel);
                }
                None => {
                    log::warn!("[SPIN] settle fired but wheel {} has not landed", schedule.session_code);
                }
            }
        }
        Err(e) => log::warn!("[SPIN] settle for missing wheel: {}", e),
    }

    // Clean up schedule row after handling event
    ctx.db.settle_schedule().id().delete(&schedule.id);
}

/// Clear results and put the wheel back at angle 0
#[reducer]
pub fn reset_for_new_pick(ctx: &ReducerContext, session_code: String) -> Result<(), String> {
    let session = find_session(ctx, &session_code)?;
    let mut wheel = load_wheel(ctx, &session.code)?;

    if !wheel.engine.reset_for_new_pick() {
        log::warn!("[SPIN] reset refused, wheel busy session:{}", session.code);
        return Err("The wheel is still spinning.".to_string());
    }

    let cleared = clear_winners(ctx, &session.code);
    let segments = segments::layout_segments(&session_participants(ctx, &session.code));
    write_frame(ctx, &session.code, wheel.engine.resting_angle(), segments, false);
    save_wheel(ctx, wheel);

    log::info!("[SPIN] reset session:{} cleared_winners:{}", session.code, cleared);
    touch_session(ctx, session);
    Ok(())
}

/// Scheduled cleanup task (runs every hour) - drops sessions idle for a day
#[reducer]
pub fn cleanup_stale_sessions(ctx: &ReducerContext, _schedule: CleanupSchedule) {
    // Only allow scheduler to call this, not clients
    if ctx.sender != ctx.identity() {
        log::warn!("Client {} attempted to call cleanup_stale_sessions", ctx.sender);
        return;
    }

    let cutoff = timestamp_ms(ctx.timestamp).saturating_sub(STALE_SESSION_SECS * 1000);
    let stale: Vec<String> = ctx.db.picker_session()
        .iter()
        .filter(|s| timestamp_ms(s.last_active_at) < cutoff)
        .filter(|s| {
            // Never pull a session out from under a running spin
            ctx.db.wheel()
                .session_code()
                .find(&s.code)
                .map(|w| !w.engine.is_busy())
                .unwrap_or(true)
        })
        .map(|s| s.code)
        .collect();

    for code in &stale {
        delete_session_data(ctx, code);
    }

    if !stale.is_empty() {
        log::info!("[CLEANUP] removed {} stale sessions", stale.len());
    }
}
