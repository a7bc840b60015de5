//! Benchmarks for compiled evaluators on a three-link arm closed by a fixed
//! point.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use kinetica::{CompileOptions, Expr, Matrix, Operand, System, WrenchKind, compiler};
use std::f64::consts::PI;

/// Acceleration term `gamma` of the loop constraint, plus the spring wrench
/// acting on the last link.
fn three_link_arm() -> kinetica::Result<(System, Operand, Operand)> {
    let mut sys = System::new();
    let th1 = sys.new_coordinate("theta1", -PI / 6.0)?;
    let th2 = sys.new_coordinate("theta2", -2.0 * PI / 6.0)?;
    let th3 = sys.new_coordinate("theta3", -3.0 * PI / 6.0)?;

    let l1 = sys.new_parameter("l1", 0.4)?;
    let l2 = sys.new_parameter("l2", 2.0)?;
    let l3 = sys.new_parameter("l3", 1.2)?;
    let l4 = sys.new_parameter("l4", 1.6)?;

    sys.new_base("Barm1", "xyz", [0.0, 1.0, 0.0], &th1[0])?;
    sys.new_base("Barm2", "Barm1", [0.0, 1.0, 0.0], &th2[0])?;
    sys.new_base("Barm3", "Barm2", [0.0, 1.0, 0.0], &th3[0])?;

    sys.new_vector("OA", (&l1, 0.0, 0.0), "Barm1")?;
    sys.new_vector("AB", (&l2, 0.0, 0.0), "Barm2")?;
    sys.new_vector("BC", (&l3, 0.0, 0.0), "Barm3")?;
    sys.new_vector("OO2", (&l4, 0.0, 0.0), "xyz")?;
    sys.new_point("A", "O", "OA")?;
    sys.new_point("B", "A", "AB")?;
    sys.new_point("C", "B", "BC")?;
    sys.new_point("O2", "O", "OO2")?;

    let arms = [
        ("Arm1", "O", "Barm1", 0.2),
        ("Arm2", "A", "Barm2", 1.0),
        ("Arm3", "B", "Barm3", 0.6),
    ];
    for (k, (solid, point, base, cgx)) in arms.into_iter().enumerate() {
        let n = k + 1;
        let m = sys.new_parameter(&format!("m{n}"), 1.0)?;
        let cx = sys.new_parameter(&format!("cg{n}x"), cgx)?;
        let cz = sys.new_parameter(&format!("cg{n}z"), 0.1)?;
        let iyy = sys.new_parameter(&format!("I{n}yy"), 1.0)?;
        let z = Expr::zero;
        let inertia = Matrix::from_rows([
            [z(), z(), z()],
            [z(), Expr::from(&iyy), z()],
            [z(), z(), z()],
        ])?;
        sys.new_vector(&format!("OG{n}"), (&cx, 0.0, &cz), base)?;
        sys.new_tensor(&format!("In{n}"), inertia, base)?;
        sys.new_solid(solid, point, base, &m, &format!("OG{n}"), &format!("In{n}"))?;
    }

    let k = sys.new_parameter("k", 50.0)?;
    let l2x = sys.new_parameter("l2x", 1.0)?;
    let l3x = sys.new_parameter("l3x", 0.5)?;
    let l3z = sys.new_parameter("l3z", 0.1)?;
    sys.new_vector("AL2", (&l2x, 0.0, 0.0), "Barm2")?;
    sys.new_vector("BL3", (&l3x, 0.0, &l3z), "Barm3")?;
    sys.new_point("OL2", "A", "AL2")?;
    sys.new_point("OL3", "B", "BL3")?;
    let fk = sys.position_vector("OL2", "OL3")?.scale(&Expr::from(&k));
    let zero = sys.vector((0.0, 0.0, 0.0), "xyz")?;
    let spring =
        sys.new_wrench("SpringR", &-fk, &zero, "OL3", "Arm3", WrenchKind::Constitutive)?;

    let o2c = sys.position_vector("O2", "C")?;
    let ex = sys.vector((1.0, 0.0, 0.0), "xyz")?;
    let ez = sys.vector((0.0, 0.0, 1.0), "xyz")?;
    let phi = Matrix::column([sys.dot(&o2c, &ex)?, sys.dot(&o2c, &ez)?]);
    let dphi = sys.derivative(phi)?;
    let ddphi = sys.derivative(dphi)?;
    let gamma = sys.subs(sys.neg(ddphi), sys.get_accelerations_matrix()?, 0.0)?;

    Ok((sys, gamma, Operand::Wrench(spring)))
}

fn bench_evaluate(c: &mut Criterion) {
    let Ok((sys, gamma, spring)) = three_link_arm() else {
        panic!("failed to build the three-link arm");
    };

    let configs = [
        ("interpreter", CompileOptions::default().with_atomize(true)),
        ("interpreter-plain", CompileOptions::default().with_atomize(false)),
        ("native", CompileOptions::default().with_atomize(true).with_native(true)),
    ];

    let mut group = c.benchmark_group("evaluate");
    for (name, target) in [("gamma", &gamma), ("spring", &spring)] {
        for (backend, options) in configs {
            let f = compiler::compile_numeric_function(&sys, target.clone(), options).unwrap();
            group.bench_with_input(BenchmarkId::new(backend, name), &f, |b, f| {
                b.iter(|| black_box(f.evaluate().unwrap()))
            });
        }
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let Ok((sys, gamma, _)) = three_link_arm() else {
        panic!("failed to build the three-link arm");
    };

    let mut group = c.benchmark_group("compile");
    for atomize in [true, false] {
        let options = CompileOptions::default().with_atomize(atomize);
        group.bench_with_input(BenchmarkId::new("gamma", atomize), &options, |b, options| {
            b.iter(|| black_box(compiler::compile_numeric_function(&sys, gamma.clone(), *options)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_compile);
criterion_main!(benches);
