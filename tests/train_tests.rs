use nablanet::approx::approx_eq;
use nablanet::layers::{Dense, Layer, Lstm, Rnn, Softmax};
use nablanet::mat::Mat;
use nablanet::network::Network;
use nablanet::optim::Sgd;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn one_hot(class: usize, classes: usize) -> Mat {
    let mut data = vec![0.0; classes];
    data[class] = 1.0;
    Mat::new(1, classes, data)
}

/// Linearly separable toy corpus: class 0 iff `x0 > x1`, with a margin so
/// plain logistic regression can classify it perfectly.
fn separable_corpus(n: usize, rng: &mut StdRng) -> Vec<(Mat, Mat)> {
    let mut data = Vec::with_capacity(n);
    while data.len() < n {
        let x0: f32 = rng.random_range(-1.0..1.0);
        let x1: f32 = rng.random_range(-1.0..1.0);
        if (x0 - x1).abs() < 0.05 {
            continue;
        }
        let class = if x0 > x1 { 0 } else { 1 };
        data.push((Mat::new(1, 2, vec![x0, x1]), one_hot(class, 2)));
    }
    data
}

#[test]
fn test_training_learns_separable_classes() {
    let mut rng = StdRng::seed_from_u64(2);
    let corpus = separable_corpus(200, &mut rng);
    let eval = corpus.clone();

    let mut net = Network::new(vec![Box::new(Dense::new(2, 2)), Box::new(Softmax)]);
    net.init(7);
    let mut sgd = Sgd::new(corpus, 0.5, 10);

    let epochs = 30;
    for _ in 0..epochs {
        net.train(&mut sgd, &mut rng);
    }
    // 20 full minibatches per epoch.
    assert_eq!(net.metrics().updates, epochs * 20);

    let mut correct = 0;
    for (input, target) in &eval {
        let result = net.forward(input.clone());
        let predicted = if result.at(0, 0) > result.at(0, 1) { 0 } else { 1 };
        let labeled = if target.at(0, 0) > target.at(0, 1) { 0 } else { 1 };
        if predicted == labeled {
            correct += 1;
        }
    }
    let accuracy = correct as f32 / eval.len() as f32;
    assert!(accuracy >= 0.95, "accuracy {accuracy} below 0.95");
}

#[test]
fn test_short_final_batch_uses_actual_sample_count() {
    // Five identical samples, batch size three: the second minibatch holds
    // two samples and must be divided by two, not three.
    let sample = || (Mat::new(1, 1, vec![1.0]), Mat::new(1, 1, vec![2.0]));
    let corpus = vec![sample(); 5];

    // Parameters start at zero (no init call), so the whole epoch is exact
    // arithmetic: batch one steps w and b to 0.6 each, the short batch sees
    // residual 1.2 - 2.0 = -0.8 twice and steps them by 0.3/2 * 1.6 = 0.24.
    let mut net = Network::new(vec![Box::new(Dense::new(1, 1))]);
    let mut sgd = Sgd::new(corpus, 0.3, 3);
    let mut rng = StdRng::seed_from_u64(0);
    net.train(&mut sgd, &mut rng);

    assert_eq!(net.metrics().updates, 2);
    let y = net.forward(Mat::new(1, 1, vec![1.0]));
    assert!(approx_eq(y.at(0, 0), 1.68, 1e-4), "got {}", y.at(0, 0));
}

#[test]
fn test_shuffle_is_deterministic_per_seed() {
    let corpus = |n: usize| -> Vec<(Mat, Mat)> {
        (0..n)
            .map(|v| (Mat::new(1, 1, vec![v as f32]), Mat::new(1, 1, vec![0.0])))
            .collect()
    };
    let mut a = Sgd::new(corpus(10), 0.1, 2);
    let mut b = Sgd::new(corpus(10), 0.1, 2);
    assert_eq!(a.len(), 10);
    assert!(!a.is_empty());
    assert_eq!(a.batch_size(), 2);
    assert_eq!(a.learning_rate(), 0.1);
    a.shuffle(&mut StdRng::seed_from_u64(9));
    b.shuffle(&mut StdRng::seed_from_u64(9));
    for i in 0..10 {
        assert_eq!(a.sample(i).0.data, b.sample(i).0.data);
    }
}

#[test]
fn test_rnn_state_carries_and_resets() {
    let mut rng = StdRng::seed_from_u64(31);
    let mut rnn = Rnn::new(2, 3);
    rnn.randomize(&mut rng);
    let x = Mat::new(1, 2, vec![0.4, -0.2]);

    let y1 = rnn.forward(x.clone());
    assert_eq!(rnn.hidden().data, y1.data);

    // With hidden state carried, the same input maps elsewhere.
    let y2 = rnn.forward(x.clone());
    assert_ne!(y1.data, y2.data);

    // After a reset the layer behaves like a fresh one.
    rnn.reset_state();
    assert_eq!(rnn.hidden().data, vec![0.0; 3]);
    let y3 = rnn.forward(x);
    assert_eq!(y1.data, y3.data);
}

#[test]
fn test_lstm_state_carries_and_resets() {
    let mut rng = StdRng::seed_from_u64(32);
    let mut lstm = Lstm::new(2, 2);
    lstm.randomize(&mut rng);
    let x = Mat::new(1, 2, vec![0.3, 0.7]);

    let y1 = lstm.forward(x.clone());
    assert_eq!(lstm.hidden().data, y1.data);
    let y2 = lstm.forward(x.clone());
    assert_ne!(y1.data, y2.data);

    lstm.reset_state();
    assert_eq!(lstm.cell().data, vec![0.0; 2]);
    let y3 = lstm.forward(x);
    assert_eq!(y1.data, y3.data);
}

#[test]
fn test_lstm_descends_on_fixed_target() {
    let mut rng = StdRng::seed_from_u64(40);
    let mut lstm = Lstm::new(2, 1);
    lstm.randomize(&mut rng);

    let corpus = vec![(Mat::zeros(1, 2), Mat::zeros(1, 1))];
    let sgd = Sgd::new(corpus, 0.5, 1);
    let x = Mat::new(1, 2, vec![0.6, -0.4]);
    let target = Mat::new(1, 1, vec![0.5]);

    let loss = |y: &Mat| {
        let r = y.at(0, 0) - 0.5;
        0.5 * r * r
    };

    lstm.reset_state();
    let initial = loss(&lstm.forward(x.clone()));
    lstm.reset_state();

    let mut last = initial;
    for _ in 0..30 {
        let y = lstm.forward(x.clone());
        last = loss(&y);
        lstm.backward(y.sub(&target));
        lstm.apply_update(&sgd, 1);
        lstm.reset_state();
    }
    assert!(
        last < initial * 0.5,
        "loss failed to descend: {initial} -> {last}"
    );
}

#[test]
fn test_network_reset_state_propagates() {
    let mut rng = StdRng::seed_from_u64(50);
    let mut net = Network::new(vec![Box::new(Rnn::new(2, 2)), Box::new(Dense::new(2, 1))]);
    net.init(50);
    let input = Mat::new(1, 2, vec![rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)]);
    let y1 = net.forward(input.clone());
    net.reset_state();
    let y2 = net.forward(input);
    assert_eq!(y1.data, y2.data);
}
