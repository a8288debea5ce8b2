use std::time::Duration;

use verity::{
    GeneratorConfig, IntGenerator, OptionGenerator, ParameterDescriptor, PropertyConfig,
    PropertyDeclaration, PropertyError, PropertyRunner, PropertyVerifier, ShrinkControl,
    ShrinkStop, Tuple, VecGenerator,
};

fn no_big_sums(args: &Tuple) -> Result<(), PropertyError> {
    let xs = args.arg::<Vec<u32>>(0)?;
    let extra = args.arg::<Option<u32>>(1)?.unwrap_or(0);
    let total: u32 = xs.iter().sum::<u32>() + extra;
    if total > 150 {
        return Err(PropertyError::property_failed(format!("sum {} > 150", total)));
    }
    Ok(())
}

fn declaration() -> PropertyDeclaration {
    PropertyDeclaration::new("no_big_sums", "invariants")
        .parameter(ParameterDescriptor::new(
            "xs",
            VecGenerator::new(IntGenerator::new(0_u32, 100), 0, 20),
        ))
        .parameter(ParameterDescriptor::new(
            "extra",
            OptionGenerator::new(IntGenerator::new(0_u32, 100)),
        ))
}

#[test]
fn minimal_counterexamples_still_falsify() {
    let verifier = PropertyVerifier::new("no_big_sums", &no_big_sums);

    for seed in 0..25 {
        let summary = PropertyRunner::new(
            declaration(),
            no_big_sums,
            PropertyConfig::new().with_seed(seed),
        )
        .run()
        .unwrap();

        let Some(counterexample) = summary.counterexample else {
            continue;
        };
        assert!(
            verifier.classify(&counterexample.minimal).is_falsified(),
            "seed {} reported a passing minimum",
            seed
        );
        assert!(verifier.classify(&counterexample.original).is_falsified());
        assert_eq!(counterexample.seeds(), counterexample.original.seeds());
    }
}

#[test]
fn shrinking_respects_every_bound() {
    let bounds = [(1, 20), (5, 2), (100, 20), (10_000, 10_000)];

    for (max_shrinks, max_depth) in bounds {
        for seed in 0..10 {
            let control = ShrinkControl::default()
                .with_max_shrinks(max_shrinks)
                .with_max_shrink_depth(max_depth);
            let summary = PropertyRunner::new(
                declaration(),
                no_big_sums,
                PropertyConfig::new()
                    .with_seed(seed)
                    .with_shrink_control(control),
            )
            .run()
            .unwrap();

            if let Some(counterexample) = summary.counterexample {
                assert!(counterexample.shrink_attempts <= max_shrinks);
                assert!(counterexample.shrink_depth <= max_depth);
                assert!(counterexample.shrink_depth <= counterexample.shrink_attempts);
                match counterexample.stop {
                    ShrinkStop::AttemptLimit => {
                        assert_eq!(counterexample.shrink_attempts, max_shrinks)
                    }
                    ShrinkStop::DepthLimit => assert_eq!(counterexample.shrink_depth, max_depth),
                    ShrinkStop::LocalMinimum => {}
                    other => panic!("unexpected stop {:?}", other),
                }
            }
        }
    }
}

#[test]
fn unbounded_search_reaches_a_local_minimum() {
    let control = ShrinkControl::default()
        .with_max_shrinks(1_000_000)
        .with_max_shrink_depth(1_000_000)
        .with_max_shrink_time(Duration::from_secs(600));
    let config = PropertyConfig::new()
        .with_seed(17)
        .with_generator_config(GeneratorConfig::new(15, 20, 100).unwrap())
        .with_shrink_control(control);

    let summary = PropertyRunner::new(declaration().with_trials(1_000), no_big_sums, config)
        .run()
        .unwrap();
    let counterexample = summary.counterexample.expect("large sums are drawn");

    assert_eq!(counterexample.stop, ShrinkStop::LocalMinimum);
    let xs = counterexample.minimal.arg::<Vec<u32>>(0).unwrap();
    let extra = counterexample.minimal.arg::<Option<u32>>(1).unwrap().unwrap_or(0);
    assert_eq!(xs.iter().sum::<u32>() + extra, 151);
}
