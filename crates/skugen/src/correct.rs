// Row-count corrector — tops up short batches and trims long ones.

use std::future::Future;

use skugen_types::{Error, GenerationRequest, OnProgress, ProgressEvent, Row, RowBatch};

use crate::prompt::continuation_prompt;

/// Bring `rows` to exactly `request.row_count()` rows.
///
/// While short, asks `generate_more` for the deficit with a continuation
/// request that embeds every row gathered so far, at most `max_rounds` times.
/// Batches are appended in order. Overshoot, from the first batch or a
/// continuation, is trimmed once at the end by dropping the tail.
///
/// `generate_more` must not correct counts itself; this function owns the
/// final count. A shortfall left after `max_rounds` is a `Shape` error.
pub async fn correct_row_count<F, Fut>(
    rows: RowBatch,
    request: &GenerationRequest,
    max_rounds: u32,
    on_progress: &OnProgress,
    mut generate_more: F,
) -> Result<RowBatch, Error>
where
    F: FnMut(GenerationRequest) -> Fut,
    Fut: Future<Output = Result<RowBatch, Error>>,
{
    let target = request.row_count();
    let mut gathered: Vec<Row> = rows.into_rows();
    let mut round = 0;

    while gathered.len() < target && round < max_rounds {
        round += 1;
        let deficit = target - gathered.len();
        tracing::debug!(round, deficit, have = gathered.len(), target, "requesting missing rows");
        on_progress(&ProgressEvent::Continuing { deficit, round });

        let context = RowBatch::new(gathered);
        let follow_up =
            request.follow_up(continuation_prompt(request.prompt(), &context, deficit), deficit)?;
        gathered = context.into_rows();

        let more = generate_more(follow_up).await?;
        if more.is_empty() {
            tracing::warn!(round, "continuation returned no rows");
        }
        gathered.extend(more);
    }

    if gathered.len() > target {
        tracing::debug!(from = gathered.len(), to = target, "truncating surplus rows");
        on_progress(&ProgressEvent::Truncated {
            from: gathered.len(),
            to: target,
        });
        gathered.truncate(target);
    }

    if gathered.len() < target {
        return Err(Error::shape(format!(
            "model returned {} of {target} rows after {round} continuation round(s)",
            gathered.len()
        )));
    }

    Ok(RowBatch::new(gathered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skugen_types::{ColumnSet, ErrorKind, ignore_progress};
    use std::sync::{Arc, Mutex};

    fn request(rows: usize) -> GenerationRequest {
        GenerationRequest::new(ColumnSet::new(["sku"]).unwrap(), "shirts", rows, 50).unwrap()
    }

    fn batch(prefix: &str, n: usize) -> RowBatch {
        (0..n)
            .map(|i| Row::new().with("sku", format!("{prefix}-{i}")))
            .collect::<Vec<_>>()
            .into()
    }

    fn skus(batch: &RowBatch) -> Vec<String> {
        batch
            .iter()
            .map(|r| r.get("sku").unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_exact_count_is_untouched() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let out = correct_row_count(batch("a", 3), &request(3), 3, &ignore_progress(), |_| {
            *counter.lock().unwrap() += 1;
            async { Ok(RowBatch::default()) }
        })
        .await
        .unwrap();
        assert_eq!(skus(&out), vec!["a-0", "a-1", "a-2"]);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deficit_is_requested_and_appended_in_order() {
        let asked = Arc::new(Mutex::new(Vec::new()));
        let log = asked.clone();
        let out = correct_row_count(batch("a", 2), &request(5), 3, &ignore_progress(), |req| {
            log.lock().unwrap().push((req.row_count(), req.prompt().to_string()));
            let n = req.row_count();
            async move { Ok(batch("b", n)) }
        })
        .await
        .unwrap();

        assert_eq!(skus(&out), vec!["a-0", "a-1", "b-0", "b-1", "b-2"]);
        let asked = asked.lock().unwrap();
        assert_eq!(asked.len(), 1);
        assert_eq!(asked[0].0, 3);
        assert!(asked[0].1.contains("a-1"));
    }

    #[tokio::test]
    async fn test_surplus_is_truncated_keeping_head() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let on_progress: OnProgress = Arc::new(move |e| sink.lock().unwrap().push(e.clone()));

        let out = correct_row_count(batch("a", 5), &request(3), 3, &on_progress, |_| async {
            Ok(RowBatch::default())
        })
        .await
        .unwrap();

        assert_eq!(skus(&out), vec!["a-0", "a-1", "a-2"]);
        assert_eq!(
            *events.lock().unwrap(),
            vec![ProgressEvent::Truncated { from: 5, to: 3 }]
        );
    }

    #[tokio::test]
    async fn test_overshooting_continuation_truncated_once_at_the_end() {
        let out = correct_row_count(batch("a", 1), &request(3), 3, &ignore_progress(), |_| async {
            Ok(batch("b", 4))
        })
        .await
        .unwrap();
        assert_eq!(skus(&out), vec!["a-0", "b-0", "b-1"]);
    }

    #[tokio::test]
    async fn test_repeated_underproduction_uses_several_rounds() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let on_progress: OnProgress = Arc::new(move |e| sink.lock().unwrap().push(e.clone()));

        let out = correct_row_count(batch("a", 1), &request(4), 3, &on_progress, |_| async {
            Ok(batch("b", 1))
        })
        .await
        .unwrap();

        assert_eq!(out.len(), 4);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                ProgressEvent::Continuing { deficit: 3, round: 1 },
                ProgressEvent::Continuing { deficit: 2, round: 2 },
                ProgressEvent::Continuing { deficit: 1, round: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn test_ceiling_reached_is_shape_error() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let err = correct_row_count(batch("a", 1), &request(4), 2, &ignore_progress(), |_| {
            *counter.lock().unwrap() += 1;
            async { Ok(RowBatch::default()) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Shape);
        assert!(err.message.contains("1 of 4"));
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_generate_more_failure_propagates() {
        let err = correct_row_count(batch("a", 1), &request(2), 3, &ignore_progress(), |_| async {
            Err(Error::from_http_status(401, "Unauthorized", "", None))
        })
        .await
        .unwrap_err();
        assert_eq!(err.status_code, Some(401));
    }
}
