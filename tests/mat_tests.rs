use nablanet::approx::{F32_MIN_ERROR, max_abs_diff};
use nablanet::mat::{Kernel, Mat, Slab, concat, multiply_acc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn test_mat_shape_mismatch_panics() {
    let result = std::panic::catch_unwind(|| {
        Mat::new(2, 2, vec![1.0, 2.0, 3.0]);
    });
    assert!(result.is_err());
}

#[test]
fn test_index_out_of_range_panics() {
    let m = Mat::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
    let read = std::panic::catch_unwind(|| m.at(2, 0));
    assert!(read.is_err());
    let write = std::panic::catch_unwind(|| {
        let mut m = Mat::zeros(2, 2);
        m.set(0, 5, 1.0);
    });
    assert!(write.is_err());
}

#[test]
fn test_elementwise_ops() {
    let mut a = Mat::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
    let b = Mat::new(2, 2, vec![4.0, 3.0, 2.0, 1.0]);
    assert_eq!(a.add(&b).data, vec![5.0, 5.0, 5.0, 5.0]);
    assert_eq!(a.sub(&b).data, vec![-3.0, -1.0, 1.0, 3.0]);
    a.hadamard_assign(&b);
    assert_eq!(a.data, vec![4.0, 6.0, 6.0, 4.0]);
    a.scale(0.5);
    assert_eq!(a.data, vec![2.0, 3.0, 3.0, 2.0]);
}

#[test]
fn test_elementwise_shape_mismatch_panics() {
    let result = std::panic::catch_unwind(|| {
        let mut a = Mat::zeros(2, 2);
        a.add_assign(&Mat::zeros(2, 3));
    });
    assert!(result.is_err());
}

#[test]
fn test_matmul_known_values() {
    let a = Mat::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let b = Mat::new(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
    let c = a.matmul(&b);
    assert_eq!(c.rows(), 2);
    assert_eq!(c.cols(), 2);
    assert_eq!(c.data, vec![58.0, 64.0, 139.0, 154.0]);
}

#[test]
fn test_matmul_inner_dim_mismatch_panics() {
    let result = std::panic::catch_unwind(|| {
        let a = Mat::zeros(2, 3);
        let b = Mat::zeros(2, 3);
        a.matmul(&b);
    });
    assert!(result.is_err());
}

#[test]
fn test_matmul_transpose_identity() {
    // (A * B)^T == B^T * A^T across several shapes.
    let mut rng = StdRng::seed_from_u64(11);
    for &(m, k, n) in &[(1usize, 1usize, 1usize), (2, 3, 4), (5, 2, 7), (4, 4, 4)] {
        let a = Mat::new(m, k, (0..m * k).map(|_| rng.random_range(-1.0..1.0)).collect());
        let b = Mat::new(k, n, (0..k * n).map(|_| rng.random_range(-1.0..1.0)).collect());
        let lhs = a.matmul(&b).transpose();
        let rhs = b.transpose().matmul(&a.transpose());
        assert!(max_abs_diff(&lhs.data, &rhs.data) < F32_MIN_ERROR);
    }
}

#[test]
fn test_reshape_keeps_storage() {
    let mut m = Mat::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    m.reshape(1, 6);
    assert_eq!(m.rows(), 1);
    assert_eq!(m.cols(), 6);
    assert_eq!(m.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    m.reshape(3, 2);
    assert_eq!(m.at(2, 1), 6.0);
}

#[test]
fn test_reshape_element_count_mismatch_panics() {
    let result = std::panic::catch_unwind(|| {
        let mut m = Mat::zeros(2, 3);
        m.reshape(4, 2);
    });
    assert!(result.is_err());
}

#[test]
fn test_kernel_window_aliases_storage() {
    let mut m = Mat::new(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    // Rows 1..3 addressed as an independent 2x2 window.
    assert_eq!(m.kernel(1, 2, 2).at(0, 0), 3.0);
    assert_eq!(m.kernel(1, 2, 2).at(1, 1), 6.0);

    // Mutations through the view are visible through the owner.
    m.kernel_mut(1, 2, 2).add_scalar(10.0);
    assert_eq!(m.data, vec![1.0, 2.0, 13.0, 14.0, 15.0, 16.0]);

    let sum = m.kernel(0, 1, 2).sum();
    assert_eq!(sum, 3.0);

    // Window-to-window accumulation.
    let ones = Mat::new(2, 2, vec![1.0; 4]);
    m.kernel_mut(1, 2, 2).add_assign(ones.kernel(0, 2, 2));
    assert_eq!(m.data, vec![1.0, 2.0, 14.0, 15.0, 16.0, 17.0]);
}

#[test]
fn test_kernel_to_mat_copies_out() {
    let m = Mat::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
    let copy = m.kernel(1, 1, 2).to_mat();
    assert_eq!(copy.data, vec![3.0, 4.0]);
}

#[test]
fn test_multiply_acc_matches_matmul() {
    let mut rng = StdRng::seed_from_u64(3);
    let a = Mat::new(3, 4, (0..12).map(|_| rng.random_range(-1.0..1.0)).collect());
    let b = Mat::new(4, 2, (0..8).map(|_| rng.random_range(-1.0..1.0)).collect());
    let expected = a.matmul(&b);

    let mut out = Mat::zeros(3, 2);
    let mut window = out.kernel_mut(0, 3, 2);
    multiply_acc(a.kernel(0, 3, 4), b.kernel(0, 4, 2), &mut window);
    assert_eq!(out.data, expected.data);
}

#[test]
fn test_slab_reinterprets_rank() {
    let m = Mat::new(2, 6, (1..=12).map(|v| v as f32).collect());
    let slab = m.slab(&[2, 2, 3]);
    assert_eq!(slab.dims(), &[2, 2, 3]);

    let second = slab.at(1);
    assert_eq!(second.dims(), &[2, 3]);
    let window = second.as_kernel(2, 3);
    assert_eq!(window.at(0, 0), 7.0);
    assert_eq!(window.at(1, 2), 12.0);
}

#[test]
fn test_slab_dimension_product_mismatch_panics() {
    let result = std::panic::catch_unwind(|| {
        let data = vec![0.0; 5];
        Slab::new(vec![2, 3], &data);
    });
    assert!(result.is_err());
}

#[test]
fn test_kernel_window_past_storage_panics() {
    let result = std::panic::catch_unwind(|| {
        let m = Mat::zeros(3, 2);
        m.kernel(2, 2, 2);
    });
    assert!(result.is_err());

    let result = std::panic::catch_unwind(|| {
        let mut m = Mat::zeros(3, 2);
        m.kernel_mut(1, 3, 2);
    });
    assert!(result.is_err());
}

#[test]
fn test_kernel_shape_mismatch_panics() {
    let result = std::panic::catch_unwind(|| {
        let data = vec![0.0; 5];
        Kernel::new(2, 3, &data);
    });
    assert!(result.is_err());
}

#[test]
fn test_concat_rows() {
    let a = Mat::new(1, 2, vec![1.0, 2.0]);
    let b = Mat::new(1, 3, vec![3.0, 4.0, 5.0]);
    let c = concat(&a, &b);
    assert_eq!(c.rows(), 1);
    assert_eq!(c.cols(), 5);
    assert_eq!(c.data, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn test_slice_cols() {
    let m = Mat::new(2, 4, (0..8).map(|v| v as f32).collect());
    let s = m.slice_cols(1, 2);
    assert_eq!(s.rows(), 2);
    assert_eq!(s.cols(), 2);
    assert_eq!(s.data, vec![1.0, 2.0, 5.0, 6.0]);
}
