//! kube-scheduler flags

use keel_common::flags::flag_map;
use keel_common::{FlagMap, OsType};

use super::{ComponentRules, KUBECONFIG_PATH};
use crate::ResolveContext;

/// kube-scheduler rules
///
/// The Windows variant is identical to Linux; the scheduler only runs on masters.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchedulerRules;

impl ComponentRules for SchedulerRules {
    fn defaults(&self, _ctx: &ResolveContext<'_>) -> FlagMap {
        flag_map([("--v", "2")])
    }

    fn static_flags(&self, _ctx: &ResolveContext<'_>, _os: OsType) -> FlagMap {
        flag_map([
            ("--kubeconfig", KUBECONFIG_PATH),
            ("--leader-elect", "true"),
            ("--profiling", "false"),
        ])
    }
}
