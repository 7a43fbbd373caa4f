//! Random bind/replace/clear sequences: every api ends with at most one
//! owning policy and the store matches a simple model.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::collections::BTreeMap;

use proptest::prelude::*;

use iplimit_admin::store::BindingStore;
use iplimit_core::model::{ApiId, PolicyId};

use common::{apis, recording_engine, whitelist};

const API_NAMES: [&str; 5] = ["a", "b", "c", "d", "e"];

#[derive(Debug, Clone)]
enum Op {
    Bind(usize, Vec<usize>),
    Replace(usize, Vec<usize>),
    ClearPolicy(usize),
    ClearApi(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let policy = 0usize..3;
    let names = prop::collection::vec(0usize..API_NAMES.len(), 1..4);
    prop_oneof![
        (policy.clone(), names.clone()).prop_map(|(p, a)| Op::Bind(p, a)),
        (policy.clone(), names).prop_map(|(p, a)| Op::Replace(p, a)),
        policy.prop_map(Op::ClearPolicy),
        (0usize..API_NAMES.len()).prop_map(Op::ClearApi),
    ]
}

fn names(idx: &[usize]) -> Vec<&'static str> {
    idx.iter().map(|i| API_NAMES[*i]).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn bindings_follow_last_writer(ops in prop::collection::vec(op(), 1..24)) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async move {
            let (store, _rec, engine) = recording_engine();
            let mut ids = Vec::new();
            for i in 0..3 {
                let name = format!("p{i}");
                ids.push(engine.add_policy(whitelist(&name, vec!["10.0.0.0/8"])).await.unwrap().value);
            }

            let mut model: BTreeMap<&'static str, PolicyId> = BTreeMap::new();
            for op in ops {
                match op {
                    Op::Bind(p, a) => {
                        engine.bind(ids[p], apis(&names(&a))).await.unwrap();
                        for n in names(&a) {
                            model.insert(n, ids[p]);
                        }
                    }
                    Op::Replace(p, a) => {
                        engine.replace_apis(ids[p], apis(&names(&a))).await.unwrap();
                        model.retain(|_, owner| *owner != ids[p]);
                        for n in names(&a) {
                            model.insert(n, ids[p]);
                        }
                    }
                    Op::ClearPolicy(p) => {
                        let removed = engine.clear_by_policy(ids[p]).await.unwrap().value;
                        let before = model.len();
                        model.retain(|_, owner| *owner != ids[p]);
                        assert_eq!(removed, before - model.len());
                    }
                    Op::ClearApi(i) => {
                        let removed = engine.clear_by_api(&ApiId::from(API_NAMES[i])).await.unwrap().value;
                        assert_eq!(removed, model.remove(API_NAMES[i]).is_some());
                    }
                }
            }

            let actual: BTreeMap<String, PolicyId> = store
                .list_all()
                .await
                .unwrap()
                .into_iter()
                .map(|b| (b.api_id.as_str().to_string(), b.policy_id))
                .collect();
            let expected: BTreeMap<String, PolicyId> =
                model.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
            assert_eq!(actual, expected);

            let per_policy: usize = {
                let mut n = 0;
                for id in &ids {
                    n += store.count_by_policy(*id).await.unwrap();
                }
                n
            };
            assert_eq!(per_policy, store.list_all().await.unwrap().len());
        });
    }
}
