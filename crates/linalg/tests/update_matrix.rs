//! Integration tests for the update-matrix pipeline in ert-linalg.

use approx::assert_abs_diff_eq;
use ert_linalg::{
    Truncation, init_std_x, invert, lowrank_cinv, par_matmul, subtract_row_mean,
};
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

fn random_matrix(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |_| StandardNormal.sample(rng))
}

#[test]
fn full_rank_update_matches_textbook_formula() {
    let mut rng = StdRng::seed_from_u64(2024);
    let (nrobs, nens) = (5, 20);
    let mut s = random_matrix(nrobs, nens, &mut rng);
    subtract_row_mean(&mut s);
    let d = random_matrix(nrobs, nens, &mut rng);
    let r = Array2::<f64>::eye(nrobs) * 0.3;

    let cinv = lowrank_cinv(s.view(), r.view(), Truncation::Energy(1.0)).unwrap();
    let x = init_std_x(s.view(), d.view(), cinv.w().view(), cinv.eig().view(), true).unwrap();

    let c = s.dot(&s.t()) + &(r * (nens as f64 - 1.0));
    let expected = Array2::<f64>::eye(nens) + s.t().dot(&invert(c.view(), "C").unwrap()).dot(&d);
    for (a, b) in x.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
    }
}

#[test]
fn huge_observation_error_leaves_ensemble_unchanged() {
    let mut rng = StdRng::seed_from_u64(5);
    let (nrobs, nens) = (4, 10);
    let mut s = random_matrix(nrobs, nens, &mut rng);
    subtract_row_mean(&mut s);
    let d = random_matrix(nrobs, nens, &mut rng);
    let r = Array2::<f64>::eye(nrobs) * 1e12;

    let cinv = lowrank_cinv(s.view(), r.view(), Truncation::default()).unwrap();
    let x = init_std_x(s.view(), d.view(), cinv.w().view(), cinv.eig().view(), true).unwrap();
    let eye = Array2::<f64>::eye(nens);
    for (a, b) in x.iter().zip(eye.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-8);
    }

    let a = random_matrix(7, nens, &mut rng);
    let updated = par_matmul(a.view(), x.view()).unwrap();
    for (u, v) in updated.iter().zip(a.iter()) {
        assert_abs_diff_eq!(*u, *v, epsilon = 1e-6);
    }
}

#[test]
fn more_observations_than_members() {
    let mut rng = StdRng::seed_from_u64(99);
    let (nrobs, nens) = (30, 8);
    let mut s = random_matrix(nrobs, nens, &mut rng);
    subtract_row_mean(&mut s);
    let d = random_matrix(nrobs, nens, &mut rng);
    let r = Array2::<f64>::eye(nrobs);

    let cinv = lowrank_cinv(s.view(), r.view(), Truncation::Components(3)).unwrap();
    assert_eq!(cinv.num_significant(), 3);
    assert_eq!(cinv.w().dim(), (nrobs, nens));
    let x = init_std_x(s.view(), d.view(), cinv.w().view(), cinv.eig().view(), true).unwrap();
    assert_eq!(x.dim(), (nens, nens));
    assert!(x.iter().all(|v| v.is_finite()));
}
