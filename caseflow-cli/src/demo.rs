//! Built-in demo suite exercising the harness end to end.
//!
//! Two feature files plus a framework hook set. `feature2.test_case2`
//! fails deliberately so a run always demonstrates the failure table in
//! the report.

use anyhow::ensure;
use caseflow::prelude::*;

/// Builds the demo registry and framework hooks.
pub fn register() -> anyhow::Result<(FileRegistry, FrameworkHooks)> {
    let framework = FrameworkHooks::new()
        .with_flag("topology", "Framework level topology")
        .with_module_setup(Stage::from_fn(
            "framework",
            "framework_module_setup",
            |ctx| {
                ctx.logger()
                    .info(format!("framework topology {:?}", ctx.args().get_str("topology")));
                Ok(Some(serde_json::json!({"framework_module_setup": "fm-mod"})))
            },
        ))
        .with_module_cleanup(Stage::from_fn(
            "framework",
            "framework_module_cleanup",
            |_ctx| Ok(None),
        ))
        .with_case_setup(Stage::from_fn("framework", "framework_case_setup", |ctx| {
            ctx.logger()
                .info(format!("{:?}", ctx.setups().framework_module_setup));
            ctx.logger()
                .info(format!("{:?}", ctx.setups().test_module_setup));
            Ok(Some(serde_json::json!({"framework_case_setup": "fm-case"})))
        }))
        .with_case_cleanup(Stage::from_fn(
            "framework",
            "framework_case_cleanup",
            |_ctx| Ok(None),
        ));

    let mut registry = FileRegistry::new();
    registry.register(
        TestFileBuilder::new("tests/feature1")
            .flag("num", "Number of requests")
            .module_setup(|ctx| {
                ctx.logger().info("Init of feature1");
                Ok(Some(serde_json::json!({"mod": "hello"})))
            })
            .module_cleanup(|ctx| {
                ctx.logger().info("Cleanup of feature1");
                Ok(None)
            })
            .case_setup(|ctx| {
                ctx.logger().info("Init of the test case");
                Ok(Some(serde_json::json!({"case": "ready"})))
            })
            .case_cleanup(|ctx| {
                ctx.logger().info("Cleanup of the test case");
                Ok(None)
            })
            .case("test_case1", "Basic sanity test", |ctx| {
                ctx.logger().info("Checking if 1+2 is 3");
                ctx.logger()
                    .info(format!("{:?}", ctx.setups().test_module_setup));
                ctx.logger()
                    .info(format!("{:?}", ctx.setups().test_case_setup));
                ctx.logger().info(format!("Args: {:?}", ctx.args()));
                check_sum(1, 2, 3)
            })
            .case("test_case2", "Basic sanity test 2", |ctx| {
                ctx.logger().info("Checking if 2+3 is 5");
                check_sum(2, 3, 5)
            })
            .build(),
    )?;
    registry.register(
        TestFileBuilder::new("tests/feature2")
            .flag("num2", "Number of retries")
            .case("test_case1", "Product check", |ctx| {
                ctx.logger().info("Checking if 1*2 is 2");
                ctx.logger().info(format!("Args: {:?}", ctx.args()));
                check_product(1, 2, 2)
            })
            .case(
                "test_case2",
                "Deliberately failing product check",
                |ctx| {
                    ctx.logger().info("Checking if 2*2 is 5");
                    check_product(2, 2, 5)
                },
            )
            .build(),
    )?;

    Ok((registry, framework))
}

fn check_sum(x: i64, y: i64, total: i64) -> StageResult {
    ensure!(x + y == total, "checked sum {x}+{y} expected {total}, got {}", x + y);
    Ok(None)
}

fn check_product(x: i64, y: i64, product: i64) -> StageResult {
    ensure!(
        x * y == product,
        "checked product {x}*{y} expected {product}, got {}",
        x * y
    );
    Ok(None)
}
