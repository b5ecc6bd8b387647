// Partitioner - データ並列のための区間分割と部分結果の合成
//
// 各ワーカーは独立した部分結果を計算してチャネルで返す。
// 合成は呼び出し側スレッドでパーティション順に1回だけ行う。

use super::context::CancellationContext;
use crate::core::{CancelReason, EngineError, EngineResult, Partition};
use num_traits::identities::Zero;

/// キャンセル確認を行う要素数の間隔
pub const CANCEL_CHECK_INTERVAL: usize = 1024;

/// 長さ `len` の列を `workers` 個の連続区間に分割する
///
/// 各区間の長さは `len / workers`。最後の区間が余りを吸収する。
/// `len < workers` の場合は空の区間が含まれる。
pub fn partition(len: usize, workers: usize) -> EngineResult<Vec<Partition>> {
    if workers == 0 {
        return Err(EngineError::configuration(
            "ワーカー数は1以上である必要があります",
        ));
    }

    let chunk = len / workers;
    let partitions: Vec<Partition> = (0..workers)
        .map(|index| {
            let start = index * chunk;
            let end = if index == workers - 1 {
                len
            } else {
                start + chunk
            };
            Partition { index, start, end }
        })
        .collect();

    verify_partitions(&partitions, len)?;
    Ok(partitions)
}

/// 区間が `[0, len)` を隙間・重複なく覆っているか検証する
pub fn verify_partitions(partitions: &[Partition], len: usize) -> EngineResult<()> {
    let covered: usize = partitions.iter().map(|p| p.end.saturating_sub(p.start)).sum();

    let mut cursor = 0;
    for (position, partition) in partitions.iter().enumerate() {
        if partition.index != position {
            return Err(EngineError::partition_mismatch(
                covered,
                len,
                format!("index {} at position {position}", partition.index),
            ));
        }
        if partition.start != cursor || partition.end < partition.start {
            return Err(EngineError::partition_mismatch(
                covered,
                len,
                format!(
                    "partition {} = [{}, {}) does not start at {cursor}",
                    partition.index, partition.start, partition.end
                ),
            ));
        }
        cursor = partition.end;
    }

    if cursor != len || covered != len {
        return Err(EngineError::partition_mismatch(
            covered,
            len,
            format!("coverage ends at {cursor}"),
        ));
    }
    Ok(())
}

/// 各パーティションを別スレッドで変換し、パーティション順に並べて返す
pub fn parallel_map_partitions<B, F>(
    len: usize,
    workers: usize,
    map: F,
) -> EngineResult<Vec<(Partition, B)>>
where
    B: Send,
    F: Fn(Partition) -> B + Sync,
{
    let partitions = partition(len, workers)?;
    let (tx, rx) = crossbeam::channel::bounded(partitions.len());

    let outcomes = crossbeam::scope(|scope| {
        let handles: Vec<_> = partitions
            .iter()
            .map(|&part| {
                let tx = tx.clone();
                let map = &map;
                scope.spawn(move |_| tx.send((part.index, map(part))))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    })
    .map_err(|_| EngineError::worker_fault(0, "パーティションワーカーがパニックしました"))?;
    drop(tx);

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                return Err(EngineError::channel(format!(
                    "partition {index}: 部分結果を送信できませんでした"
                )))
            }
            Err(_) => {
                return Err(EngineError::worker_fault(
                    index,
                    "パーティションワーカーがパニックしました",
                ))
            }
        }
    }

    let mut blocks: Vec<(usize, B)> = rx.iter().collect();
    if blocks.len() != partitions.len() {
        return Err(EngineError::partition_mismatch(
            blocks.len(),
            partitions.len(),
            "missing partial results",
        ));
    }
    blocks.sort_by_key(|(index, _)| *index);

    Ok(partitions
        .into_iter()
        .zip(blocks)
        .map(|(part, (_, block))| (part, block))
        .collect())
}

/// パーティション単位で畳み込み、部分結果を合成する
///
/// `combine` は結合的であること。浮動小数点の丸め順序による差は保証外。
pub fn parallel_reduce<T, A, F, C>(
    data: &[T],
    workers: usize,
    identity: A,
    fold: F,
    combine: C,
) -> EngineResult<A>
where
    T: Sync,
    A: Clone + Send + Sync,
    F: Fn(A, &T) -> A + Sync,
    C: Fn(A, A) -> A,
{
    let partials = parallel_map_partitions(data.len(), workers, |part| {
        data[part.range()]
            .iter()
            .fold(identity.clone(), |acc, value| fold(acc, value))
    })?;

    Ok(partials
        .into_iter()
        .fold(identity, |acc, (_, partial)| combine(acc, partial)))
}

/// キャンセル可能な parallel_reduce
///
/// 各ワーカーは CANCEL_CHECK_INTERVAL 要素ごとにコンテキストを確認する
pub fn parallel_reduce_with_context<T, A, F, C>(
    ctx: &CancellationContext,
    data: &[T],
    workers: usize,
    identity: A,
    fold: F,
    combine: C,
) -> EngineResult<A>
where
    T: Sync,
    A: Clone + Send + Sync,
    F: Fn(A, &T) -> A + Sync,
    C: Fn(A, A) -> A,
{
    ctx.check("parallel_reduce")?;

    let partials = parallel_map_partitions(data.len(), workers, |part| {
        let mut acc = identity.clone();
        for chunk in data[part.range()].chunks(CANCEL_CHECK_INTERVAL) {
            if ctx.is_cancelled() {
                return None;
            }
            acc = chunk.iter().fold(acc, |acc, value| fold(acc, value));
        }
        Some(acc)
    })?;

    let mut total = identity;
    for (_, partial) in partials {
        match partial {
            Some(partial) => total = combine(total, partial),
            None => {
                return Err(EngineError::cancelled(
                    "parallel_reduce",
                    ctx.reason().unwrap_or(CancelReason::Cancelled),
                ))
            }
        }
    }
    Ok(total)
}

/// 写像した値の並列総和
pub fn parallel_sum<T, R, M>(data: &[T], workers: usize, map: M) -> EngineResult<R>
where
    T: Sync,
    R: Zero + Clone + Send + Sync,
    M: Fn(&T) -> R + Sync,
{
    parallel_reduce(data, workers, R::zero(), |acc, value| acc + map(value), |a, b| a + b)
}

/// 逐次実行のベースライン
pub fn sequential_sum<T, R, M>(data: &[T], map: M) -> R
where
    R: Zero,
    M: Fn(&T) -> R,
{
    data.iter().fold(R::zero(), |acc, value| acc + map(value))
}
