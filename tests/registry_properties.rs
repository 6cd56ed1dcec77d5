// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property tests: an adapter ends up mirroring the registry.

use std::collections::BTreeMap;

use data_consumer_adapter::adapter::{DataConsumerAdapter, EntityCatalog, UnknownEntityPolicy};
use data_consumer_adapter::entity::DeviceInfo;
use data_consumer_adapter::event::{ChangeEvent, EventSource};
use data_consumer_adapter::registry::EntityRegistry;
use data_consumer_adapter::AdapterConfig;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Change {
    Upsert { id: u8, name: String },
    Remove { id: u8 },
}

fn change() -> impl Strategy<Value = Change> {
    prop_oneof![
        (0u8..8, "[a-z]{1,6}").prop_map(|(id, name)| Change::Upsert { id, name }),
        (0u8..8).prop_map(|id| Change::Remove { id }),
    ]
}

fn quiet(name: &str) -> AdapterConfig {
    AdapterConfig::new(name).with_unknown_entity_policy(UnknownEntityPolicy::Ignore)
}

proptest! {
    #[test]
    fn catalog_mirrors_registry(
        initial in proptest::collection::vec(change(), 0..16),
        later in proptest::collection::vec(change(), 0..32),
    ) {
        let registry = EntityRegistry::new();
        let apply = |changes: &[Change]| {
            for change in changes {
                match change {
                    Change::Upsert { id, name } => {
                        registry.upsert(DeviceInfo::new(id.to_string(), name.clone()));
                    }
                    Change::Remove { id } => {
                        registry.remove(&id.to_string());
                    }
                }
            }
        };

        apply(&initial);
        let adapter = DataConsumerAdapter::new(quiet("Mirror"), EntityCatalog::new(), registry.publisher()).unwrap();
        adapter.start(registry.snapshot()).unwrap();
        apply(&later);
        adapter.stop().unwrap();

        let expected: BTreeMap<String, String> = registry
            .snapshot()
            .iter()
            .map(|e| (e.id().to_string(), e.name().to_string()))
            .collect();
        let mirrored: BTreeMap<String, String> = adapter.with_registrar(|catalog| {
            catalog
                .ids()
                .into_iter()
                .filter_map(|id| catalog.get(&id).map(|e| (id.clone(), e.name().to_string())))
                .collect()
        });

        prop_assert_eq!(mirrored, expected);
    }

    #[test]
    fn raw_events_apply_in_order(changes in proptest::collection::vec(change(), 0..32)) {
        let source = EventSource::new();
        let adapter = DataConsumerAdapter::new(quiet("Ordered"), EntityCatalog::new(), &source).unwrap();

        let mut model = BTreeMap::new();
        for change in &changes {
            match change {
                Change::Upsert { id, name } => {
                    model.insert(id.to_string(), name.clone());
                    source.notify(&ChangeEvent::upserted(DeviceInfo::new(id.to_string(), name.clone())));
                }
                Change::Remove { id } => {
                    model.remove(&id.to_string());
                    source.notify(&ChangeEvent::removed(id.to_string()));
                }
            }
        }

        let ids: Vec<String> = model.keys().cloned().collect();
        prop_assert_eq!(adapter.with_registrar(EntityCatalog::ids), ids);
    }
}
