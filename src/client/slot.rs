use crate::arena::SlotContent;
use crate::item::ItemWorkflow;
use crate::query::QueryWorkflow;
use crate::transport::CallHandle;

/// Content of one client slot.
#[derive(Debug)]
pub(crate) enum Workflow {
    Query(QueryWorkflow),
    Item(ItemWorkflow),
}

impl SlotContent for Workflow {
    fn handles(&mut self) -> Vec<CallHandle> {
        let handle = match self {
            Workflow::Query(query) => query.reset(),
            Workflow::Item(item) => item.reset(),
        };
        handle.into_iter().collect()
    }
}
