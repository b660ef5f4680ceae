//! Section renderers for the projects grid, skills and contact list.
//!
//! Each section is rendered to markup first and only then written into the
//! document, so a failing template never leaves a half-cleared container.

use serde::Serialize;
use thiserror::Error;

use crate::dom::Document;
use crate::site::{Project, Site, SkillCategories};
use crate::template::{CONTACT_ITEM, PROJECT_CARD, SKILLS_CATEGORY, TemplateError, TemplateRenderer};

pub const PROJECTS_GRID: &str = "projects-grid";
pub const SKILLS_CONTENT: &str = "skills-content";
pub const CONTACT_ITEMS: &str = "contact-items";

const EMAIL_ICON: &str = "fas fa-envelope";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Debug, Serialize)]
struct ProjectCard<'a> {
    href: Option<&'a str>,
    icon: &'a str,
    title: &'a str,
    blurb: &'a str,
    tags: &'a [String],
}

impl<'a> From<&'a Project> for ProjectCard<'a> {
    fn from(project: &'a Project) -> Self {
        Self {
            href: project.href(),
            icon: project.icon(),
            title: project.title(),
            blurb: project.blurb(),
            tags: &project.tags,
        }
    }
}

#[derive(Debug, Serialize)]
struct SkillView<'a> {
    icon: &'a str,
    label: &'a str,
}

#[derive(Debug, Serialize)]
struct CategoryView<'a> {
    name: &'a str,
    skills: Vec<SkillView<'a>>,
}

#[derive(Debug, Serialize)]
struct ContactItem<'a> {
    icon: &'a str,
    href: String,
    label: &'a str,
    external: bool,
}

/// Rendered markup for the three repeated sections.
#[derive(Debug, Default)]
pub struct Sections {
    pub projects: Vec<String>,
    pub skills: Vec<String>,
    pub contact: Vec<String>,
}

pub struct Renderer {
    templates: TemplateRenderer,
}

impl Renderer {
    pub fn new(templates: TemplateRenderer) -> Self {
        Self { templates }
    }

    pub fn builtin() -> Result<Self, RenderError> {
        Ok(Self::new(TemplateRenderer::new()?))
    }

    pub fn render_projects(&self, projects: &[Project]) -> Result<Vec<String>, RenderError> {
        projects
            .iter()
            .map(|project| {
                let card = ProjectCard::from(project);
                self.templates
                    .render(PROJECT_CARD, "project", &card)
                    .map_err(RenderError::from)
            })
            .collect()
    }

    pub fn render_skills(&self, skills: &SkillCategories) -> Result<Vec<String>, RenderError> {
        skills
            .iter()
            .map(|(name, items)| {
                let category = CategoryView {
                    name,
                    skills: items
                        .iter()
                        .map(|skill| SkillView {
                            icon: skill.icon(),
                            label: skill.label(),
                        })
                        .collect(),
                };
                self.templates
                    .render(SKILLS_CATEGORY, "category", &category)
                    .map_err(RenderError::from)
            })
            .collect()
    }

    pub fn render_contact(&self, site: &Site) -> Result<Vec<String>, RenderError> {
        let mut items = Vec::with_capacity(site.socials.len() + 1);
        if let Some(email) = site.email() {
            items.push(ContactItem {
                icon: EMAIL_ICON,
                href: format!("mailto:{email}"),
                label: email,
                external: false,
            });
        }
        for social in &site.socials {
            items.push(ContactItem {
                icon: social.icon(),
                href: social.href.clone(),
                label: &social.label,
                external: true,
            });
        }

        items
            .iter()
            .map(|item| {
                self.templates
                    .render(CONTACT_ITEM, "item", item)
                    .map_err(RenderError::from)
            })
            .collect()
    }

    pub fn render_sections(&self, site: &Site) -> Result<Sections, RenderError> {
        Ok(Sections {
            projects: self.render_projects(&site.projects)?,
            skills: self.render_skills(&site.skills)?,
            contact: self.render_contact(site)?,
        })
    }
}

/// Write rendered sections into their containers. Missing containers are
/// skipped.
pub fn apply_sections(doc: &mut Document, sections: &Sections) {
    fill_container(doc, PROJECTS_GRID, &sections.projects);
    fill_container(doc, SKILLS_CONTENT, &sections.skills);
    fill_container(doc, CONTACT_ITEMS, &sections.contact);
}

fn fill_container(doc: &mut Document, id: &str, fragments: &[String]) {
    let Some(container) = doc.get_element_by_id(id) else {
        tracing::debug!("No #{id} container in page, skipping");
        return;
    };
    doc.clear_children(container);
    for fragment in fragments {
        doc.append_html(container, fragment);
    }
}
