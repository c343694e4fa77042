//! Property tests for batch ranges and accumulation

use async_trait::async_trait;
use parking_lot::Mutex;
use proptest::prelude::*;
use stagehand::batch::{BatchAccumulator, BatchCursor, BatchSpec};
use stagehand::capability::{CapabilityId, CapabilityInvoker};
use stagehand::config::BatchConfig;
use stagehand::error::CapabilityError;
use std::sync::Arc;

struct Parts {
    calls: Mutex<u32>,
}

#[async_trait]
impl CapabilityInvoker for Parts {
    async fn invoke(
        &self,
        _capability: &CapabilityId,
        _instruction: &str,
    ) -> Result<String, CapabilityError> {
        let mut calls = self.calls.lock();
        let text = format!("part {}", *calls);
        *calls += 1;
        Ok(text)
    }
}

fn spec(units: u32, batches: u32) -> BatchSpec {
    BatchSpec {
        kind: "outline".to_string(),
        brief: "brief".to_string(),
        total_units: units,
        total_batches: batches,
    }
}

proptest! {
    #[test]
    fn expansion_ranges_partition_the_units(units in 0u32..60, batches in 2u32..8) {
        let cursor = BatchCursor::new(&spec(units, batches));
        let whole = cursor.range_for(0);
        prop_assert_eq!((whole.start, whole.end), (1, units));

        let mut next_unit = 1;
        for index in 1..batches {
            let range = cursor.range_for(index);
            prop_assert_eq!(range.start, next_unit);
            if !range.is_empty() {
                next_unit = range.end + 1;
            }
        }
        prop_assert_eq!(next_unit, units + 1);
    }

    #[test]
    fn run_joins_every_batch_in_order(batches in 0u32..7, separator in "[-=\n]{1,4}") {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let accumulator = BatchAccumulator::new(
            Arc::new(Parts { calls: Mutex::new(0) }),
            BatchConfig { context_window_chars: 16, separator: separator.clone() },
        );
        let mut cursor = BatchCursor::new(&spec(12, batches));
        let artifact = runtime.block_on(accumulator.run(&mut cursor)).unwrap();

        let expected: Vec<String> = (0..batches.max(1)).map(|i| format!("part {}", i)).collect();
        prop_assert_eq!(artifact, expected.join(&separator));
        prop_assert!(cursor.is_complete());
    }

    #[test]
    fn trailing_context_is_bounded(text in "\\PC{0,200}", max_chars in 0usize..100) {
        let mut cursor = BatchCursor::new(&spec(4, 3));
        cursor.commit(&text, "\n");
        let context = cursor.trailing_context(max_chars);
        prop_assert!(context.chars().count() <= max_chars);
        prop_assert!(text.ends_with(context));
    }
}
