//! The shipped header and footer.

use crate::{FooterData, FooterLinkGroup, HeaderData, NavLink, SiteData, SocialLink};

pub(crate) fn site_data() -> SiteData {
    SiteData {
        header: HeaderData {
            links: vec![
                NavLink::new("Home", "/"),
                NavLink::new("About", "#about"),
                NavLink::new("Projects", "#projects"),
                NavLink::new("Testimonials", "#testimonials"),
                NavLink::new("Blog", "/blog"),
            ],
            actions: vec![NavLink::new("Book a call", "#")],
        },
        footer: FooterData {
            links: vec![
                FooterLinkGroup {
                    title: "Services".to_string(),
                    links: vec![NavLink::new("Services", "#")],
                },
                FooterLinkGroup {
                    title: "Company".to_string(),
                    links: vec![NavLink::new("About", "#"), NavLink::new("Blog", "/blog")],
                },
            ],
            secondary_links: vec![
                NavLink::new("Terms", "/terms"),
                NavLink::new("Privacy Policy", "/privacy"),
            ],
            social_links: vec![
                social("LinkedIn", "tabler:brand-linkedin", "#"),
                social("RSS", "tabler:rss", "/rss.xml"),
            ],
            foot_note: "Made by Markus Smet · All rights reserved.".to_string(),
        },
    }
}

fn social(aria_label: &str, icon: &str, href: &str) -> SocialLink {
    SocialLink {
        aria_label: aria_label.to_string(),
        icon: icon.to_string(),
        href: href.to_string(),
    }
}
