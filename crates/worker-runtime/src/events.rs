//! Bus events turned into metrics and operator logs.
//!
//! Vote counters are bumped by the consumer itself; the bridge covers what
//! only the bus sees: tree passes, listing rebuilds and quarantines.

use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, PipelineEvent, Subscription, TreePass};
use std::sync::Arc;
use tippr_telemetry::metrics::{AGGREGATES_QUARANTINED, LISTING_REBUILDS, TREE_PASSES};
use tippr_telemetry::{log_event, metric_inc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const COMPONENT: &str = "event_bridge";

/// Topics the bridge listens to.
pub fn bridge_filter() -> EventFilter {
    EventFilter::topics(vec![
        EventTopic::Trees,
        EventTopic::Listings,
        EventTopic::Supervisor,
        EventTopic::DeadLetterQueue,
    ])
}

/// Record one event.
pub fn observe(event: &PipelineEvent) {
    match event {
        PipelineEvent::TreeUpdated { root_id, pass, nodes } => {
            let label = match pass {
                TreePass::Rebuild => "rebuild",
                TreePass::Resort => "resort",
            };
            metric_inc!(TREE_PASSES, &[label]);
            log_event!(trace, COMPONENT, "Tree updated", root_id = %root_id, pass = label, nodes = *nodes);
        }
        PipelineEvent::ListingRebuilt {
            container_id,
            sort,
            window,
            generation,
            items,
        } => {
            metric_inc!(LISTING_REBUILDS, &[sort.as_str()]);
            log_event!(
                trace,
                COMPONENT,
                "Listing rebuilt",
                container_id = %container_id,
                sort = %sort,
                window = %window,
                generation = *generation,
                items = *items
            );
        }
        PipelineEvent::AggregateQuarantined { item_id, reason } => {
            metric_inc!(AGGREGATES_QUARANTINED);
            log_event!(error, COMPONENT, "Aggregate quarantined", item_id = %item_id, reason = %reason);
        }
        PipelineEvent::CriticalError { component, error } => {
            log_event!(error, COMPONENT, "Critical error reported", source = %component, error = %error);
        }
        PipelineEvent::PoolStateChanged {
            queue,
            state,
            consumers,
        } => {
            log_event!(info, COMPONENT, "Consumer pool state changed", queue = %queue, state = %state, consumers = *consumers);
        }
        _ => {}
    }
}

/// Drain `subscription` until shutdown or until the bus goes away.
pub async fn run_bridge(mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            event = subscription.recv() => match event {
                Some(event) => observe(&event),
                None => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    // Anything published before shutdown is still counted.
    for event in subscription.drain() {
        observe(&event);
    }
    if subscription.lagged() > 0 {
        log_event!(warn, COMPONENT, "Event bridge fell behind", lagged = subscription.lagged());
    }
}

pub fn spawn_bridge(bus: &Arc<InMemoryEventBus>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let subscription = bus.subscribe(bridge_filter());
    tokio::spawn(run_bridge(subscription, shutdown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::EventPublisher;
    use shared_types::entities::{ContainerId, ItemId, SortOrder, TimeWindow};
    use std::time::Duration;

    #[test]
    fn test_filter_skips_vote_traffic() {
        let filter = bridge_filter();
        assert!(!filter.matches(&PipelineEvent::VoteNoOp {
            item_id: ItemId(1),
            voter_id: shared_types::entities::UserId(2),
        }));
        assert!(filter.matches(&PipelineEvent::AggregateQuarantined {
            item_id: ItemId(1),
            reason: "downs underflow".into(),
        }));
    }

    #[tokio::test]
    async fn test_bridge_counts_events() {
        let bus = Arc::new(InMemoryEventBus::new());
        let (tx, rx) = watch::channel(false);
        let task = spawn_bridge(&bus, rx);

        let controversial = LISTING_REBUILDS.with_label_values(&["controversial"]).get();
        let quarantined = AGGREGATES_QUARANTINED.get();

        bus.publish(PipelineEvent::ListingRebuilt {
            container_id: ContainerId(3),
            sort: SortOrder::Controversial,
            window: TimeWindow::Week,
            generation: 7,
            items: 12,
        })
        .await;
        bus.publish(PipelineEvent::AggregateQuarantined {
            item_id: ItemId(9),
            reason: "ups underflow".into(),
        })
        .await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        assert!(LISTING_REBUILDS.with_label_values(&["controversial"]).get() > controversial);
        assert!(AGGREGATES_QUARANTINED.get() > quarantined);
    }

    #[tokio::test]
    async fn test_bridge_stops_when_bus_dropped() {
        let bus = Arc::new(InMemoryEventBus::new());
        let (_tx, rx) = watch::channel(false);
        let task = spawn_bridge(&bus, rx);
        drop(bus);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
