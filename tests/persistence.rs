use ferrite_ffnn::{ActivationFunction, Error, Network, NetworkConfig};
use tempfile::tempdir;

fn config(seed: u64) -> NetworkConfig {
    NetworkConfig::new()
        .layer(3, 4, ActivationFunction::Sigmoid)
        .layer(4, 4, ActivationFunction::LeakyReLU)
        .layer(4, 2, ActivationFunction::Softmax)
        .regularization(0.001)
        .seed(seed)
}

#[test]
fn weights_round_trip_through_text_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weights.txt");

    let mut trained = config(1).build().unwrap();
    trained
        .train(&[vec![0.1, 0.2, 0.3]], &[vec![0.0, 1.0]], 0.5)
        .unwrap();
    trained.save_file(&path).unwrap();

    let mut fresh = config(2).build().unwrap();
    fresh.load_file(&path).unwrap();

    for (a, b) in trained.layers().iter().zip(fresh.layers()) {
        for (x, y) in a.weights().as_slice().iter().zip(b.weights().as_slice()) {
            assert!((x - y).abs() < 1e-15);
        }
        assert_eq!(a.biases(), b.biases());
    }
    let input = [0.9, -0.4, 0.05];
    assert_eq!(trained.predict(&input).unwrap(), fresh.predict(&input).unwrap());
}

#[test]
fn loading_into_different_topology_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weights.txt");
    config(1).build().unwrap().save_file(&path).unwrap();

    let mut other = NetworkConfig::new()
        .layer(3, 2, ActivationFunction::Softmax)
        .build()
        .unwrap();
    assert!(matches!(
        other.load_file(&path),
        Err(Error::PersistenceFormat { .. })
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let mut network = config(1).build().unwrap();
    assert!(matches!(
        network.load_file(dir.path().join("absent.txt")),
        Err(Error::Io(_))
    ));
}

#[test]
fn json_snapshot_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.json");
    let path = path.to_str().unwrap();

    let network = config(3).build().unwrap();
    network.save_json(path).unwrap();
    let loaded = Network::load_json(path).unwrap();
    assert_eq!(network, loaded);
}

#[test]
fn json_snapshot_with_broken_topology_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.json");
    let path = path.to_str().unwrap();

    let network = NetworkConfig::new()
        .layer(3, 4, ActivationFunction::Sigmoid)
        .layer(4, 5, ActivationFunction::LeakyReLU)
        .layer(5, 2, ActivationFunction::Softmax)
        .build()
        .unwrap();
    let mut value = serde_json::to_value(&network).unwrap();
    value["layers"].as_array_mut().unwrap().remove(1);
    std::fs::write(path, value.to_string()).unwrap();

    assert!(matches!(
        Network::load_json(path),
        Err(Error::LayerSizeMismatch { index: 1, expected: 5, found: 4 })
    ));
}

#[test]
fn json_snapshot_with_bad_hyperparameters_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.json");

    let network = config(4).build().unwrap();
    let clean = serde_json::to_value(&network).unwrap();

    for (field, value) in [("learning_rate", -3.0), ("learning_rate", 0.0), ("lambda", -1.0)] {
        let mut broken = clean.clone();
        broken[field] = serde_json::json!(value);
        std::fs::write(&path, broken.to_string()).unwrap();
        assert!(
            matches!(Network::load_json(&path), Err(Error::InvalidConfig(_))),
            "{field} = {value} was accepted"
        );
    }

    let single = NetworkConfig::new()
        .layer(1, 1, ActivationFunction::Linear)
        .build()
        .unwrap();
    let mut empty_layer = serde_json::to_value(&single).unwrap();
    empty_layer["layers"][0]["size"]["output"] = serde_json::json!(0);
    empty_layer["layers"][0]["weights"] = serde_json::json!({"rows": 0, "cols": 1, "data": []});
    empty_layer["layers"][0]["biases"] = serde_json::json!({"rows": 0, "cols": 1, "data": []});
    std::fs::write(&path, empty_layer.to_string()).unwrap();
    assert!(matches!(Network::load_json(&path), Err(Error::InvalidConfig(_))));
}

#[test]
fn config_round_trips_through_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    let path = path.to_str().unwrap();

    let cfg = config(9);
    cfg.save_json(path).unwrap();
    let loaded = NetworkConfig::load_json(path).unwrap();
    assert_eq!(cfg, loaded);
    assert_eq!(cfg.build().unwrap(), loaded.build().unwrap());
}
