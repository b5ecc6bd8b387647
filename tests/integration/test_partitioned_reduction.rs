// パーティション分割と並列リダクションの統合テスト
#[path = "../fixtures/mod.rs"]
mod fixtures;

use fixtures::pseudo_random_floats;
use parallel_engine::core::EngineError;
use parallel_engine::engine::{
    parallel_map_partitions, parallel_reduce, parallel_reduce_with_context, parallel_sum,
    partition, sequential_sum, CancellationContext,
};
use parallel_engine::workloads::{heavy_computation, heavy_input, Matrix};

#[test]
fn test_partitions_cover_input_exactly() {
    for len in [0, 1, 2, 7, 100, 1_001, 4_096] {
        for workers in [1, 2, 3, 8, 16] {
            let parts = partition(len, workers).unwrap();

            assert_eq!(parts.len(), workers);
            assert_eq!(parts[0].start, 0);
            assert_eq!(parts[workers - 1].end, len);
            assert_eq!(parts.iter().map(|p| p.len()).sum::<usize>(), len);
            for pair in parts.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
            // 最後以外は同じ長さ
            for part in &parts[..workers - 1] {
                assert_eq!(part.len(), len / workers);
            }
        }
    }
}

#[test]
fn test_zero_workers_is_a_configuration_error() {
    assert!(matches!(
        partition(10, 0),
        Err(EngineError::ConfigurationError { .. })
    ));
}

#[test]
fn test_parallel_float_sum_matches_sequential() {
    for seed in [1, 42, 2024] {
        let data = pseudo_random_floats(10_000, seed);
        let expected = sequential_sum(&data, |v| *v);

        for workers in [1, 2, 3, 7, 16] {
            let actual: f64 = parallel_sum(&data, workers, |v| *v).unwrap();
            assert!(
                (actual - expected).abs() <= 1e-9 * expected.abs(),
                "seed {seed}, workers {workers}: {actual} vs {expected}"
            );
        }
    }
}

#[test]
fn test_parallel_integer_sum_is_exact() {
    let data: Vec<u64> = (1..=100_000).collect();

    for workers in [1, 4, 9] {
        let sum: u64 = parallel_sum(&data, workers, |v| *v).unwrap();
        assert_eq!(sum, 100_000 * 100_001 / 2);
    }
}

#[test]
fn test_more_workers_than_elements() {
    let data = vec![1.5f64, 2.5];
    let sum: f64 = parallel_sum(&data, 8, |v| *v).unwrap();
    assert_eq!(sum, 4.0);

    let empty: Vec<f64> = Vec::new();
    let sum: f64 = parallel_sum(&empty, 4, |v| *v).unwrap();
    assert_eq!(sum, 0.0);
}

#[test]
fn test_heavy_computation_sum_matches_sequential() {
    let data = heavy_input(5_000);
    let expected = sequential_sum(&data, |v| heavy_computation(*v));
    let actual: f64 = parallel_sum(&data, 6, |v| heavy_computation(*v)).unwrap();

    assert!((actual - expected).abs() <= 1e-6 * expected.abs());
}

#[test]
fn test_non_commutative_reduction_keeps_partition_order() {
    let data: Vec<char> = "partitioned reduction".chars().collect();

    let joined = parallel_reduce(
        &data,
        5,
        String::new(),
        |mut acc, c| {
            acc.push(*c);
            acc
        },
        |mut a, b| {
            a.push_str(&b);
            a
        },
    )
    .unwrap();

    assert_eq!(joined, "partitioned reduction");
}

#[test]
fn test_map_partitions_returns_blocks_in_order() {
    let blocks = parallel_map_partitions(10, 3, |part| part.range().collect::<Vec<_>>()).unwrap();

    let indices: Vec<usize> = blocks.iter().map(|(part, _)| part.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    let flattened: Vec<usize> = blocks.into_iter().flat_map(|(_, block)| block).collect();
    assert_eq!(flattened, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_reduction_with_live_context_completes() {
    let ctx = CancellationContext::new();
    let data: Vec<u64> = (0..50_000).collect();

    let sum = parallel_reduce_with_context(&ctx, &data, 4, 0u64, |acc, v| acc + v, |a, b| a + b)
        .unwrap();
    assert_eq!(sum, data.iter().sum::<u64>());
}

#[test]
fn test_parallel_matrix_multiply_matches_sequential() {
    let size = 64;
    let values = pseudo_random_floats(size * size * 2, 7);
    let a = Matrix::from_fn(size, size, |i, j| values[i * size + j]);
    let b = Matrix::from_fn(size, size, |i, j| values[size * size + i * size + j]);

    let expected = a.multiply(&b).unwrap();
    for workers in [1, 3, 8, 100] {
        let actual = a.multiply_parallel(&b, workers).unwrap();
        assert_eq!((actual.rows(), actual.cols()), (size, size));
        assert!(actual.max_abs_diff(&expected) < 1e-9);
    }
}

#[test]
fn test_rectangular_matrix_multiply() {
    let a = Matrix::from_fn(5, 3, |i, j| (i + j) as f64);
    let b = Matrix::from_fn(3, 4, |i, j| (i * j) as f64 + 1.0);

    let product = a.multiply_parallel(&b, 2).unwrap();
    assert_eq!((product.rows(), product.cols()), (5, 4));
    assert_eq!(product, a.multiply(&b).unwrap());
}
