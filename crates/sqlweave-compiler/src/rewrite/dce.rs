//! Liveness: reachability from the retained call-site set.
//!
//! A validator is live only while some retained call site references it; a
//! fragment is live while a retained call site reaches it directly or
//! through merges. Everything else is dropped from emitted output.

use indexmap::IndexSet;

use crate::fragment::CompiledProgram;
use crate::resolve::{FragmentId, FuncId};

#[derive(Debug, Default)]
pub struct Liveness {
    pub validators: IndexSet<FuncId>,
    pub fragments: IndexSet<FragmentId>,
}

/// BFS from the retained call sites through the merge edges.
pub fn compute(
    retained: impl IntoIterator<Item = (FragmentId, Vec<FuncId>)>,
    program: &CompiledProgram,
) -> Liveness {
    let mut live = Liveness::default();
    let mut queue: Vec<FragmentId> = Vec::new();

    for (fragment, validators) in retained {
        queue.push(fragment);
        live.validators.extend(validators);
    }

    while let Some(id) = queue.pop() {
        if !live.fragments.insert(id) {
            continue;
        }
        queue.extend(program.sub_ids(id));
    }

    live
}
