use kinetica::{CompileOptions, Output, System};
use parking_lot::Mutex;
use std::sync::Arc;

// One test: the default system is process-wide.
#[test]
fn free_functions_share_the_default_system() {
    kinetica::reset_default_system();

    let [q, dq, _] = kinetica::new_coordinate("q", (0.0, 2.0)).unwrap();
    let l = kinetica::new_parameter("l", 0.5).unwrap();
    kinetica::new_base("B", "xyz", [0.0, 0.0, 1.0], &q).unwrap();
    kinetica::new_vector("OA", (&l, 0.0, 0.0), "B").unwrap();
    kinetica::new_point("A", "O", "OA").unwrap();

    assert_eq!(kinetica::get_coordinates(), [q.clone()]);
    assert_eq!(kinetica::get_velocities(), [dq.clone()]);
    assert_eq!(kinetica::get_symbol("l").unwrap(), l);
    assert!(kinetica::get_point("A").is_ok());
    let frame = kinetica::new_frame("F", "O", "xyz", 1.0).unwrap();
    kinetica::set_frame_point(&frame, "A").unwrap();
    assert_eq!(kinetica::get_frame("F").unwrap().point().name(), "A");

    let v = kinetica::velocity_vector("A").unwrap();
    let f = kinetica::compile_numeric_function(&v, CompileOptions::default()).unwrap();
    let Output::Matrix(m) = f.evaluate().unwrap() else {
        panic!("velocity should compile to a column");
    };
    assert_eq!((m.rows(), m.cols()), (3, 1));
    assert_eq!(m[(1, 0)], 1.0);

    // Evaluators follow later values in the same system.
    kinetica::set_value("l", 2.0).unwrap();
    assert_eq!(f.evaluate().unwrap().values()[1], 4.0);

    // A replaced default starts from the new system.
    let previous = kinetica::set_default_system(Arc::new(Mutex::new(System::new())));
    assert!(previous.lock().has_parameter("l"));
    assert!(kinetica::get_symbol("l").is_err());
    let n = kinetica::with_default_system(|sys| sys.get_parameters().len());
    assert_eq!(n, 1, "only g");
    let k = kinetica::with_default_system(|sys| sys.new_parameter("k", 3.0)).unwrap();
    assert_eq!(kinetica::get_value(&k).unwrap(), 3.0);
    assert!(kinetica::get_coordinates_matrix().is_err());

    kinetica::reset_default_system();
    assert!(kinetica::get_point("A").is_err());
}
