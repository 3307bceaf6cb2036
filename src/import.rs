// Bulk roster import
// Moves a roster kept in browser storage (the offline picker) into a live session.
// Accepts the JSON array written by LocalRoster::to_json or an SDK table export.

use spacetimedb::{reducer, ReducerContext, Table, log};
use crate::{Registration, find_session, touch_session, session_participants};
use crate::registration;
use crate::roster::{same_name, LocalRoster, Participant};

/// Participants from `incoming` whose names are not taken yet, in incoming order,
/// plus the number skipped as already registered
pub fn plan_import(existing: &[Participant], incoming: &LocalRoster) -> (Vec<Participant>, usize) {
    let mut taken: Vec<String> = existing.iter().map(|p| p.name.clone()).collect();
    let mut to_add = Vec::new();
    let mut skipped = 0;

    for participant in incoming.participants() {
        if taken.iter().any(|name| same_name(name, &participant.name)) {
            skipped += 1;
            continue;
        }
        taken.push(participant.name.clone());
        to_add.push(participant.clone());
    }

    (to_add, skipped)
}

/// Merge a locally saved roster into a session, keeping registration order.
/// Names already in the session are skipped rather than treated as errors.
#[reducer]
pub fn import_roster(ctx: &ReducerContext, session_code: String, json_data: String) -> Result<(), String> {
    let session = find_session(ctx, &session_code)?;

    let incoming = LocalRoster::from_json(&json_data)?;
    let existing = session_participants(ctx, &session.code);
    let (to_add, skipped) = plan_import(&existing, &incoming);

    let count = to_add.len();
    for participant in to_add {
        ctx.db.registration().insert(Registration {
            id: 0, // auto_inc
            session_code: session.code.clone(),
            name: participant.name,
            registered_at: participant.registered_at,
        });
    }

    touch_session(ctx, session);
    log::info!("[IMPORT] session:{} imported:{} skipped:{}", session_code, count, skipped);
    Ok(())
}
