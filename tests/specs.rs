extern crate framelet;
use framelet::{ConditionScope, Context, RenderOptions, Template, YamlValue};

use std::fs;
use serde::Deserialize;

#[test]
fn variables_test() -> Result<(), String> {
    run_spec_file("variables.yml", true)
}

#[test]
fn conditionals_test() -> Result<(), String> {
    run_spec_file("conditionals.yml", true)
}

#[test]
fn loops_test() -> Result<(), String> {
    run_spec_file("loops.yml", true)
}


fn run_spec_file(path: &str, log: bool) -> Result<(), String> {
    yaml_spec(path)?
        .tests
        .iter()
        .fold(
            Ok(()),
            |acc, test| match (acc, run_spec_test(test, log)) {
                (acc, Ok(())) => acc,
                (Ok(()), Err(name)) => Err(format!("specs ({}): {}", path, name)),
                (Err(err), Err(name)) => Err(format!("{}, {}", err, name))
            }
        )
}

#[derive(Deserialize, Debug)]
struct YamlSpecFile {
    tests: Vec<YamlTestSpec>,
}

#[derive(Deserialize, Debug)]
struct YamlTestSpec {
    name: String,
    data: YamlValue,
    template: String,
    expected: String,
    failures: Option<usize>,
    condition_scope: Option<ConditionScope>,
}

fn yaml_spec(name: &str) -> Result<YamlSpecFile, String> {
    let path = format!("tests/specs/{}", name);
    let text = fs::read_to_string(path).map_err(
        |err| format!("io: {}", err)
    )?;
    serde_yaml::from_str::<YamlSpecFile>(&text).map_err(
        |err| format!("yaml: {}", err)
    )
}

fn run_spec_test(test: &YamlTestSpec, log: bool) -> Result<(), String> {
    let template = Template::from(&test.template).map_err(
        |err| format!("{}: {}", test.name, err)
    )?;
    let context = Context::try_from(&test.data).map_err(
        |err| format!("{}: {}", test.name, err)
    )?;
    let options = RenderOptions {
        condition_scope: test.condition_scope.unwrap_or_default(),
    };
    let rendered = template.render_with(&context, &options);
    let failures_match = test.failures.map_or(true, |n| n == rendered.failures.len());
    if rendered.text != test.expected || !failures_match {
        if log {
            println!("{}: fail", test.name);
            println!("expected:\n{}", test.expected);
            println!("received:\n{}", rendered.text);
            println!("failures: {:?}\n", rendered.failures);
        };
        Err(test.name.clone())
    } else {
        if log {
            println!("{}: ok", test.name);
        }
        Ok(())
    }
}
