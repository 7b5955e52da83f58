//! Periodic peace negotiation between hostile colonies.
//!
//! Enemies that are not currently fighting may sign a truce, more readily
//! the more they still trust each other. A truce between colonies that have
//! rebuilt some trust may later relax back into neutrality.

use colonia_types::{DiplomaticEvent, DiplomaticEventKind, RelationKind};
use rand::Rng;
use tracing::debug;

use crate::system::WarfareSystem;

/// Trust gained by signing a truce.
const TRUCE_TRUST_GAIN: f64 = 0.1;

/// Trust a Truce pair needs before it may normalize.
const NORMALIZATION_TRUST: f64 = 0.4;

impl WarfareSystem {
    /// Run one round of peace negotiation over every registered pair.
    pub(crate) fn attempt_diplomacy(&mut self, tick: u64) {
        for (a, b) in self.ledger.pairs() {
            match self.ledger.relation(a, b) {
                RelationKind::Enemy => {
                    if self.ledger.conflict_between(a, b).is_some() {
                        continue;
                    }
                    let trust = self.ledger.trust(a, b);
                    let chance = self.config.peace_chance * (1.0 + trust);
                    if self.rng.random::<f64>() >= chance {
                        continue;
                    }
                    self.ledger.set_relation(a, b, RelationKind::Truce);
                    self.ledger.adjust_trust(a, b, TRUCE_TRUST_GAIN);
                    for (from, to) in [(a, b), (b, a)] {
                        self.ledger.record_event(
                            from,
                            to,
                            DiplomaticEvent::new(
                                tick,
                                DiplomaticEventKind::TruceSigned,
                                to,
                                format!("Signed a truce with colony {to}"),
                            )
                            .with_deltas(TRUCE_TRUST_GAIN, 0.0),
                        );
                    }
                    self.report.truces_signed = self.report.truces_signed.saturating_add(1);
                    debug!(tick, a = %a, b = %b, trust, "Truce signed");
                }
                RelationKind::Truce => {
                    if self.ledger.trust(a, b) < NORMALIZATION_TRUST
                        || self.rng.random::<f64>() >= self.config.normalization_chance
                    {
                        continue;
                    }
                    self.ledger.set_relation(a, b, RelationKind::Neutral);
                    for (from, to) in [(a, b), (b, a)] {
                        self.ledger.record_event(
                            from,
                            to,
                            DiplomaticEvent::new(
                                tick,
                                DiplomaticEventKind::RelationsNormalized,
                                to,
                                format!("Relations with colony {to} normalized"),
                            ),
                        );
                    }
                    self.report.relations_normalized =
                        self.report.relations_normalized.saturating_add(1);
                    debug!(tick, a = %a, b = %b, "Relations normalized");
                }
                RelationKind::Neutral
                | RelationKind::Allied
                | RelationKind::Trading
                | RelationKind::Vassal => {}
            }
        }
    }
}
