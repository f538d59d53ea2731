mod common;

use slate_core::AnyEmptyResult;

#[test]
fn render_with_set_bindings_to_stdout() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let template = tmp.path().join("greet.tpl");
	std::fs::write(&template, "Hello {{ name }}!")?;

	let mut cmd = common::slate_cmd();
	cmd.arg("render")
		.arg(&template)
		.arg("--set")
		.arg("name=World")
		.assert()
		.success()
		.stdout("Hello World!");

	Ok(())
}

#[test]
fn render_with_list_binding() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let template = tmp.path().join("loop.tpl");
	std::fs::write(&template, "{% for i in items %}{{ i }}-{% endfor %}")?;

	let mut cmd = common::slate_cmd();
	cmd.arg("render")
		.arg(&template)
		.arg("--list")
		.arg("items=a,b,c")
		.assert()
		.success()
		.stdout("a-b-c-");

	Ok(())
}

#[test]
fn render_with_toml_data_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let template = tmp.path().join("page.tpl");
	let data = tmp.path().join("site.toml");
	std::fs::write(&template, "{{ title }}/{{ tags }}/{{ user.name }}")?;
	std::fs::write(&data, "title = \"Home\"\ntags = [\"a\", \"b\"]\n\n[user]\nname = \"Ada\"\n")?;

	let mut cmd = common::slate_cmd();
	cmd.arg("render")
		.arg(&template)
		.arg("--data")
		.arg(&data)
		.assert()
		.success()
		.stdout("Home/2/Ada");

	Ok(())
}

#[test]
fn set_flags_override_the_data_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let template = tmp.path().join("page.tpl");
	let data = tmp.path().join("site.toml");
	std::fs::write(&template, "{{ title }}")?;
	std::fs::write(&data, "title = \"From File\"\n")?;

	let mut cmd = common::slate_cmd();
	cmd.arg("render")
		.arg(&template)
		.arg("--data")
		.arg(&data)
		.arg("--set")
		.arg("title=From Flag")
		.assert()
		.success()
		.stdout("From Flag");

	Ok(())
}

#[test]
fn render_to_output_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let template = tmp.path().join("greet.tpl");
	let output = tmp.path().join("greet.txt");
	std::fs::write(&template, "Hi {{ name }}")?;

	let mut cmd = common::slate_cmd();
	cmd.arg("render")
		.arg(&template)
		.arg("--set")
		.arg("name=there")
		.arg("--output")
		.arg(&output)
		.assert()
		.success();

	assert_eq!(std::fs::read_to_string(&output)?, "Hi there");

	Ok(())
}

#[test]
fn missing_template_file_fails_with_a_diagnostic() {
	let mut cmd = common::slate_cmd();
	cmd.arg("render")
		.arg("/definitely/not/here.tpl")
		.assert()
		.failure()
		.code(2)
		.stderr(predicates::str::contains("could not open template file"));
}

#[test]
fn invalid_set_binding_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let template = tmp.path().join("greet.tpl");
	std::fs::write(&template, "hi")?;

	let mut cmd = common::slate_cmd();
	cmd.arg("render")
		.arg(&template)
		.arg("--set")
		.arg("no-equals-sign")
		.assert()
		.failure()
		.code(2)
		.stderr(predicates::str::contains("expected KEY=VALUE"));

	Ok(())
}
