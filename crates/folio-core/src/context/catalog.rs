//! Static per-project descriptive records. Live repository statistics get
//! merged in by the store; everything here is compile-time data.

/// A catalog entry: the hand-written half of a `ProjectContext`.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Stable project identifier used by callers.
    pub id: &'static str,
    /// Repository name under the configured account.
    pub repo: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub technologies: &'static [&'static str],
    pub lines: u64,
    pub github_url: &'static str,
    pub demo_url: Option<&'static str>,
    pub highlights: &'static [&'static str],
}

pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "event-manager",
        repo: "NITS-Event-Managment",
        name: "NIT Silchar Event Manager",
        description: "75,000+ lines of AI-orchestrated code creating a comprehensive event management platform",
        technologies: &[
            "React",
            "Node.js",
            "Firebase",
            "Google Sheets API",
            "Recharts",
            "Cloudinary",
            "QR Code System",
        ],
        lines: 75_000,
        github_url: "https://github.com/DhrubaAgarwalla/NITS-Event-Managment",
        demo_url: Some("https://nits-event-managment.vercel.app/"),
        highlights: &[
            "75,000+ lines of AI-orchestrated code",
            "Reduced event registration time by 70%",
            "Real-time QR code attendance system with email automation",
            "Google Sheets integration with automated data pipeline",
            "Role-based access control (Admin, Club, Participant)",
            "Built in 3-4 weeks with $0 budget through AI collaboration",
        ],
    },
    CatalogEntry {
        id: "gitiq",
        repo: "GitIQ",
        name: "GitIQ - AI Repository Insights",
        description: "40,000+ lines of intelligent GitHub analysis tool with multi-AI provider integration",
        technologies: &[
            "Next.js 14",
            "TypeScript",
            "Groq AI",
            "Google Gemini",
            "HuggingFace",
            "Recharts",
            "GitHub API",
        ],
        lines: 40_000,
        github_url: "https://github.com/DhrubaAgarwalla/GitIQ",
        demo_url: Some("https://git-iq.vercel.app/"),
        highlights: &[
            "40,000+ lines built in less than a week",
            "Multi-AI provider integration (Groq, Gemini, HuggingFace)",
            "Ultra-fast processing: 0.12s per commit analysis",
            "Advanced commit categorization and pattern recognition",
            "Real-time repository health scoring",
            "Over-delivered: Created enterprise-level tool for club project",
        ],
    },
    CatalogEntry {
        id: "portfolio-website",
        repo: "stellar-code-lab",
        name: "AI-Orchestrated Portfolio",
        description: "This revolutionary portfolio website showcasing the future of AI-driven development",
        technologies: &[
            "React",
            "TypeScript",
            "Tailwind CSS",
            "Framer Motion",
            "Vite",
            "shadcn/ui",
        ],
        lines: 15_000,
        github_url: "https://github.com/DhrubaAgarwalla/stellar-code-lab",
        demo_url: Some("https://portfolio-dhruba.vercel.app/"),
        highlights: &[
            "Meta-project: Portfolio showcasing AI-orchestrated development",
            "Advanced cyberpunk design with glassmorphism effects",
            "Comprehensive sections: Hero, Projects, About, Tech Stack, Contact",
            "Enhanced 3D card effects and smooth animations",
            "Mobile-responsive with professional loading screen",
            "Built through strategic AI collaboration and prompt engineering",
        ],
    },
];

/// Query keyword to repository mapping. Order matters: the first keyword
/// found in a query wins, so more specific phrases come first.
pub const QUERY_KEYWORDS: &[(&str, &str)] = &[
    ("event manager", "NITS-Event-Managment"),
    ("nit silchar", "NITS-Event-Managment"),
    ("gitiq", "GitIQ"),
    ("git iq", "GitIQ"),
    ("repository insights", "GitIQ"),
    ("portfolio", "stellar-code-lab"),
    ("website", "stellar-code-lab"),
];

pub fn entry_by_id(id: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.id == id)
}

pub fn entry_by_repo(repo: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.repo == repo)
}
