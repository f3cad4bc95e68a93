//! Listener method defaults: every unimplemented operation answers 405.

use serde_json::{json, Value};

use restbus::{
    Outcome, ResourceError, ResourceEvent, ResourceListener, RestResponse,
};

mod common;
use common::controller_for;

struct NoVerbs;

impl ResourceListener for NoVerbs {}

struct GetOnly;

impl ResourceListener for GetOnly {
    fn fetch(&self, id: &Value, _event: &ResourceEvent) -> Result<Outcome, ResourceError> {
        Ok(json!({ "id": id.clone(), "name": "anvil" }).into())
    }
}

fn problem_of(response: &RestResponse) -> (u16, &str) {
    let problem = response.as_problem().expect("expected a problem response");
    (problem.status(), problem.detail())
}

#[test]
fn test_every_default_names_its_verb_and_route_kind() {
    let mut controller = controller_for(NoVerbs);

    let response = controller.create(json!({ "name": "anvil" })).unwrap();
    assert_eq!(
        problem_of(&response),
        (405, "The POST method has not been defined")
    );

    let response = controller.update(json!("1"), json!({ "name": "b" })).unwrap();
    assert_eq!(
        problem_of(&response),
        (405, "The PUT method has not been defined for individual resources")
    );

    let response = controller.replace_list(json!([{ "id": "1" }])).unwrap();
    assert_eq!(
        problem_of(&response),
        (405, "The PUT method has not been defined for collections")
    );

    let response = controller.patch(json!("1"), json!({ "name": "c" })).unwrap();
    assert_eq!(
        problem_of(&response),
        (405, "The PATCH method has not been defined for individual resources")
    );

    let response = controller.patch_list(json!([{ "id": "1" }])).unwrap();
    assert_eq!(
        problem_of(&response),
        (405, "The PATCH method has not been defined for collections")
    );

    let response = controller.delete(json!("1")).unwrap();
    assert_eq!(
        problem_of(&response),
        (405, "The DELETE method has not been defined for individual resources")
    );

    let response = controller.delete_list(None).unwrap();
    assert_eq!(
        problem_of(&response),
        (405, "The DELETE method has not been defined for collections")
    );

    let response = controller.get(json!("1")).unwrap();
    assert_eq!(
        problem_of(&response),
        (405, "The GET method has not been defined for individual resources")
    );

    let response = controller.get_list().unwrap();
    assert_eq!(
        problem_of(&response),
        (405, "The GET method has not been defined for collections")
    );
}

#[test]
fn test_implemented_operations_are_unaffected_by_the_defaults() {
    let mut controller = controller_for(GetOnly);

    let response = controller.get(json!("1")).unwrap();
    let entity = response.as_entity().expect("expected an entity response");
    assert_eq!(entity.value()["name"], "anvil");

    let response = controller.create(json!({ "name": "b" })).unwrap();
    assert_eq!(
        problem_of(&response),
        (405, "The POST method has not been defined")
    );
}
