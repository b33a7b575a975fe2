// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Page extraction used by the login flow
//!
//! Only the pieces authentication needs: the CSRF token of the login form
//! and the identity shown once logged in. Anything richer belongs in a
//! dedicated [`PageParser`].

use std::collections::HashSet;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::ParseOpts;
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;

use crate::session::{Registration, User};

lazy_static! {
    static ref REGISTRATION_CODES: Regex =
        Regex::new(r"/(\d{7})/(\d{7})/").expect("REGISTRATION_CODES should compile");
    static ref LEARNER_CODE: Regex =
        Regex::new(r"codeApprenant\s*=\s*(\d+)").expect("LEARNER_CODE should compile");
    static ref ACADEMIC_YEAR: Regex =
        Regex::new(r"\((\d{4}-\d{4})\)").expect("ACADEMIC_YEAR should compile");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("WHITESPACE should compile");
}

/// Link sections that carry `/<learner>/<registration>/` in their href
const REGISTRATION_SECTIONS: &[&str] = &["/bulletin/", "/assiduite/", "/calendrier/"];

/// Extracts what the auth flow needs from raw pages
pub trait PageParser: Send + Sync {
    /// Anti-forgery token of the login form, if the page has one
    fn csrf_token(&self, html: &str) -> Option<String>;

    /// Identity of the logged-in user from the landing page
    fn user(&self, html: &str, username: &str) -> User;
}

/// html5ever-backed parser for the stock pages
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPageParser;

impl PageParser for DefaultPageParser {
    fn csrf_token(&self, html: &str) -> Option<String> {
        let dom = parse_html(html);
        find_element(&dom.document, &|node| {
            tag_name(node) == Some("input") && attr(node, "name").as_deref() == Some("token_csrf")
        })
        .and_then(|input| attr(&input, "value"))
        .filter(|token| !token.is_empty())
    }

    fn user(&self, html: &str, username: &str) -> User {
        let dom = parse_html(html);

        let full_name = find_element(&dom.document, &|node| has_class(node, "user-info-label"))
            .map(|label| normalize_text(&own_text(&label)))
            .filter(|text| !text.is_empty());

        User {
            username: username.to_string(),
            full_name,
            avatar_url: None,
            registrations: parse_registrations(&dom.document),
        }
    }
}

/// Collapse whitespace runs and trim
pub fn normalize_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn parse_html(html: &str) -> RcDom {
    parse_document(RcDom::default(), ParseOpts::default()).one(html)
}

fn tag_name(node: &Handle) -> Option<&str> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(&*name.local),
        _ => None,
    }
}

fn attr(node: &Handle, name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn has_class(node: &Handle, class: &str) -> bool {
    attr(node, "class").map_or(false, |value| value.split_whitespace().any(|c| c == class))
}

/// First element in document order matching `pred`
fn find_element(node: &Handle, pred: &dyn Fn(&Handle) -> bool) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if pred(child) {
            return Some(child.clone());
        }
        if let Some(found) = find_element(child, pred) {
            return Some(found);
        }
    }
    None
}

/// Visit every element with its ancestors, outermost first
fn walk(node: &Handle, ancestors: &mut Vec<Handle>, visit: &mut dyn FnMut(&Handle, &[Handle])) {
    for child in node.children.borrow().iter() {
        if tag_name(child).is_none() {
            continue;
        }
        visit(child, ancestors.as_slice());
        ancestors.push(child.clone());
        walk(child, ancestors, visit);
        ancestors.pop();
    }
}

/// Text nodes directly inside `node`, entities decoded
fn own_text(node: &Handle) -> String {
    let mut text = String::new();
    for child in node.children.borrow().iter() {
        if let NodeData::Text { ref contents } = child.data {
            text.push_str(&contents.borrow());
        }
    }
    text
}

/// All descendant text
fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text(node: &Handle, out: &mut String) {
    for child in node.children.borrow().iter() {
        match child.data {
            NodeData::Text { ref contents } => out.push_str(&contents.borrow()),
            NodeData::Element { .. } => collect_text(child, out),
            _ => {}
        }
    }
}

/// Section title of the `.block` a registration link sits in
fn block_title(ancestors: &[Handle]) -> String {
    let Some(block) = ancestors.iter().rev().find(|a| has_class(a, "block")) else {
        return String::new();
    };
    find_title(block, false).unwrap_or_default()
}

fn find_title(node: &Handle, in_toolbar: bool) -> Option<String> {
    for child in node.children.borrow().iter() {
        if tag_name(child).is_none() {
            continue;
        }
        if has_class(child, "category-header-title") || (in_toolbar && tag_name(child) == Some("h3"))
        {
            return Some(normalize_text(&text_content(child)));
        }
        if let Some(title) = find_title(child, in_toolbar || has_class(child, "block-toolbar")) {
            return Some(title);
        }
    }
    None
}

fn parse_registrations(document: &Handle) -> Vec<Registration> {
    let mut registrations = Vec::new();
    let mut seen = HashSet::new();

    let mut push = |code: u64, name: String| {
        if code == 0 || !seen.insert(code) {
            return;
        }
        let year = ACADEMIC_YEAR
            .captures(&name)
            .map(|caps| caps[1].to_string())
            .unwrap_or_default();
        let name = if name.is_empty() {
            format!("Inscription {}", code)
        } else {
            name
        };
        registrations.push(Registration::new(code, name, year));
    };

    let mut options = Vec::new();
    walk(document, &mut Vec::new(), &mut |node, ancestors| {
        let in_select = ancestors.iter().any(|a| {
            tag_name(a) == Some("select") && attr(a, "name").as_deref() == Some("codeInscription")
        });
        if in_select && tag_name(node) == Some("option") {
            let code = attr(node, "value")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(0);
            options.push((code, normalize_text(&text_content(node))));
        }
    });
    for (code, name) in options {
        push(code, name);
    }

    for section in REGISTRATION_SECTIONS {
        let mut links = Vec::new();
        walk(document, &mut Vec::new(), &mut |node, ancestors| {
            if tag_name(node) != Some("a") {
                return;
            }
            let Some(href) = attr(node, "href").filter(|h| h.contains(section)) else {
                return;
            };
            if let Some(code) = REGISTRATION_CODES
                .captures(&href)
                .and_then(|caps| caps[2].parse::<u64>().ok())
            {
                links.push((code, block_title(ancestors)));
            }
        });
        for (code, name) in links {
            push(code, name);
        }
    }

    if registrations.is_empty() {
        let mut scripts = String::new();
        walk(document, &mut Vec::new(), &mut |node, _| {
            if tag_name(node) == Some("script") {
                scripts.push_str(&text_content(node));
            }
        });
        if let Some(code) = LEARNER_CODE
            .captures(&scripts)
            .and_then(|caps| caps[1].parse::<u64>().ok())
        {
            registrations.push(Registration::new(code, format!("Inscription {}", code), ""));
        }
    }

    registrations
}
