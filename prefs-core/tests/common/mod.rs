//! Classes shared by the integration tests

#![allow(dead_code)]

use std::rc::Rc;

use prefs_core::{Node, Prefs, PrefsClass, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: i64,
    pub alive: bool,
}

impl Person {
    pub fn new(name: &str, age: i64, alive: bool) -> Self {
        Self {
            name: name.to_string(),
            age,
            alive,
        }
    }
}

pub struct PersonClass;

impl PrefsClass for PersonClass {
    type Object = Person;

    fn from_object(&self, _: &mut Prefs, node: &Node, person: &Person, _: &mut ()) -> Result<()> {
        node.set_string("name", person.name.as_str());
        node.set_int("age", person.age);
        node.set_bool("alive", person.alive);
        Ok(())
    }

    fn to_object(&self, _: &mut Prefs, node: &Node, _: &mut ()) -> Result<Option<Rc<Person>>> {
        Ok(Some(Rc::new(Person {
            name: node.get_string("name")?,
            age: node.get_int("age")?,
            alive: node.get_bool("alive")?,
        })))
    }
}

#[derive(Debug, Default)]
pub struct People {
    pub people: Vec<Rc<Person>>,
}

pub struct PeopleClass;

impl PrefsClass for PeopleClass {
    type Object = People;

    fn from_object(&self, prefs: &mut Prefs, node: &Node, people: &People, user: &mut ()) -> Result<()> {
        for person in &people.people {
            let child = prefs.obj_to_node("person", person.as_ref(), user)?;
            node.add_child(child)?;
        }
        Ok(())
    }

    fn to_object(&self, prefs: &mut Prefs, node: &Node, user: &mut ()) -> Result<Option<Rc<People>>> {
        let mut people = People::default();
        for child in node.children() {
            if child.tag() != "person" {
                continue;
            }
            if let Some(person) = prefs.obj_from_node_as::<Person>(&child, user)? {
                people.people.push(person);
            }
        }
        Ok(Some(Rc::new(people)))
    }
}

pub fn prefs() -> Prefs {
    let mut prefs = Prefs::new().expect("default config is valid");
    prefs.register_class("person", PersonClass).expect("register person");
    prefs.register_class("people", PeopleClass).expect("register people");
    prefs
}

pub fn bob_and_alice() -> People {
    People {
        people: vec![
            Rc::new(Person::new("Bob", 30, true)),
            Rc::new(Person::new("Alice", 25, false)),
        ],
    }
}
