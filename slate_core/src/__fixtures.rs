use crate::Dict;
use crate::Template;

/// A template over the standard fixture environment: a few vars, a list
/// and a dictionary, enough to exercise every resolution path.
pub fn fixture_template(source: &str) -> Template {
	let mut template = Template::new(source, "fixture");
	template
		.set("name", "World")
		.set("html", "<b>bold</b>")
		.set("score", "75")
		.set("empty", "")
		.set("flag", "1")
		.set_list("items", ["a", "b", "c"])
		.set_dict("user", user_dict());
	template
}

pub fn user_dict() -> Dict {
	let mut dict = Dict::new();
	dict.set("name", "Ada").set("role", "admin");
	dict
}

/// Render `source` against the fixture environment.
pub fn render_fixture(source: &str) -> String {
	fixture_template(source).render()
}
