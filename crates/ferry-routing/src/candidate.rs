//! Transfer candidates and the ordered attempt loop
//!
//! Every strategy runs the same tick skeleton:
//!
//! 1. [`begin_tick`]: bail out when there is nothing to send or a transfer
//!    is already running, then try direct delivery
//! 2. the strategy builds and orders its [`TransferCandidate`]s
//! 3. [`attempt_in_order`]: start the first candidate the node accepts

use ferry_core::{
    Connection, HostId, MessageId, NodeContext, RoutingError, TickOutcome, TransferScheme,
};
use tracing::{debug, trace};

/// A message paired with the connection it would travel over
#[derive(Debug, Clone, PartialEq)]
pub struct TransferCandidate {
    pub message: MessageId,
    pub connection: Connection,
    /// The peer at the other end of `connection`
    pub peer: HostId,
    /// Geometric scheme justifying the transfer, if any
    pub scheme: Option<TransferScheme>,
}

impl TransferCandidate {
    pub fn new(message: MessageId, connection: Connection, local: HostId) -> Self {
        Self {
            message,
            peer: connection.other(local),
            connection,
            scheme: None,
        }
    }

    pub fn with_scheme(mut self, scheme: TransferScheme) -> Self {
        self.scheme = Some(scheme);
        self
    }
}

/// Shared pre-step of every tick
///
/// Returns `Some` when the tick is over before the strategy gets to choose.
pub fn begin_tick(ctx: &mut dyn NodeContext) -> Option<TickOutcome> {
    if !ctx.can_start_transfer() || ctx.is_transferring(ctx.local()) {
        return Some(TickOutcome::Idle);
    }
    if ctx.exchange_deliverable() {
        debug!(host = %ctx.local(), "Direct delivery started");
        return Some(TickOutcome::DirectDelivery);
    }
    None
}

/// Try candidates in order until one transfer starts
///
/// `prepare` runs right before each start and `rollback` right after a
/// refused one.
pub fn attempt_in_order<P, R>(
    ctx: &mut dyn NodeContext,
    candidates: &[TransferCandidate],
    mut prepare: P,
    mut rollback: R,
) -> Result<TickOutcome, RoutingError>
where
    P: FnMut(&mut dyn NodeContext, &TransferCandidate) -> Result<(), RoutingError>,
    R: FnMut(&mut dyn NodeContext, &TransferCandidate) -> Result<(), RoutingError>,
{
    for candidate in candidates {
        prepare(&mut *ctx, candidate)?;

        let status = ctx.start_transfer(&candidate.message, &candidate.connection);
        if status.is_started() {
            debug!(
                host = %ctx.local(),
                peer = %candidate.peer,
                message = %candidate.message,
                scheme = ?candidate.scheme,
                "Transfer started"
            );
            return Ok(TickOutcome::Started {
                message: candidate.message.clone(),
                peer: candidate.peer,
                scheme: candidate.scheme,
            });
        }

        trace!(
            peer = %candidate.peer,
            message = %candidate.message,
            status = ?status,
            "Candidate refused"
        );
        rollback(&mut *ctx, candidate)?;
    }

    Ok(TickOutcome::Exhausted {
        attempted: candidates.len(),
    })
}

/// [`attempt_in_order`] without any per-attempt bookkeeping
pub fn attempt_plain(
    ctx: &mut dyn NodeContext,
    candidates: &[TransferCandidate],
) -> Result<TickOutcome, RoutingError> {
    attempt_in_order(ctx, candidates, |_, _| Ok(()), |_, _| Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{Coord, Message, MockWorld};

    fn make_world() -> MockWorld {
        let mut world = MockWorld::new();
        for i in 0..3 {
            world.add_host(HostId(i), Coord::new(f64::from(i), 0.0), 10.0);
        }
        world
    }

    #[test]
    fn test_begin_tick_idle_without_messages() {
        let mut world = make_world();
        world.connect(HostId(0), HostId(1)).unwrap();
        assert_eq!(begin_tick(&mut world.node(HostId(0))), Some(TickOutcome::Idle));
    }

    #[test]
    fn test_begin_tick_direct_delivery() {
        let mut world = make_world();
        world.insert_message(HostId(0), Message::new("M1", HostId(0), HostId(1), 10));
        world.connect(HostId(0), HostId(1)).unwrap();
        assert_eq!(
            begin_tick(&mut world.node(HostId(0))),
            Some(TickOutcome::DirectDelivery)
        );
        // Now transferring
        assert_eq!(begin_tick(&mut world.node(HostId(0))), Some(TickOutcome::Idle));
    }

    #[test]
    fn test_attempt_stops_at_first_success() {
        let mut world = make_world();
        world.insert_message(HostId(0), Message::new("M1", HostId(0), HostId(2), 10));
        world.connect(HostId(0), HostId(1)).unwrap();
        world.connect(HostId(0), HostId(2)).unwrap();
        world.set_accepting(HostId(1), false);

        let to_1 = Connection::new(HostId(0), HostId(1));
        let to_2 = Connection::new(HostId(0), HostId(2));
        let candidates = vec![
            TransferCandidate::new(MessageId::new("M1"), to_1, HostId(0)),
            TransferCandidate::new(MessageId::new("M1"), to_2, HostId(0)),
        ];

        let mut prepared = Vec::new();
        let mut rolled_back = Vec::new();
        let outcome = attempt_in_order(
            &mut world.node(HostId(0)),
            &candidates,
            |_, c| {
                prepared.push(c.peer);
                Ok(())
            },
            |_, c| {
                rolled_back.push(c.peer);
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(prepared, vec![HostId(1), HostId(2)]);
        assert_eq!(rolled_back, vec![HostId(1)]);
        assert!(matches!(outcome, TickOutcome::Started { peer: HostId(2), .. }));
    }

    #[test]
    fn test_attempt_exhausted() {
        let mut world = make_world();
        world.insert_message(HostId(0), Message::new("M1", HostId(0), HostId(2), 10));
        world.connect(HostId(0), HostId(1)).unwrap();
        world.set_accepting(HostId(1), false);

        let con = Connection::new(HostId(0), HostId(1));
        let candidates = vec![TransferCandidate::new(MessageId::new("M1"), con, HostId(0))];
        let outcome = attempt_plain(&mut world.node(HostId(0)), &candidates).unwrap();
        assert_eq!(outcome, TickOutcome::Exhausted { attempted: 1 });

        let outcome = attempt_plain(&mut world.node(HostId(0)), &[]).unwrap();
        assert_eq!(outcome, TickOutcome::Exhausted { attempted: 0 });
    }
}
