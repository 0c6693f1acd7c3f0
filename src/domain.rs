//! Closed enumerations for entity domains, id namespaces, and attribute categories.
//!
//! Categories are fixed as tagged variants rather than discovered
//! dynamically, so that an unknown or mis-spelled category fails to compile
//! rather than failing at runtime deep inside a comparator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two entity domains the registry and stores partition by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Genes, canonically identified by Entrez id.
    Gene,
    /// Diseases, canonically identified by MONDO id.
    Disease,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Gene => write!(f, "gene"),
            Domain::Disease => write!(f, "disease"),
        }
    }
}

/// An id namespace an external identifier may be expressed in.
///
/// [`Namespace::Entrez`] and [`Namespace::Mondo`] are the canonical
/// namespaces for [`Domain::Gene`] and [`Domain::Disease`] respectively;
/// every other variant is an alias namespace that resolves to zero, one, or
/// several canonical entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    /// Entrez gene id (canonical gene namespace).
    Entrez,
    /// Ensembl gene id.
    Ensembl,
    /// HGNC gene symbol.
    Symbol,
    /// UniProt Swiss-Prot accession.
    Uniprot,
    /// MONDO disease id (canonical disease namespace).
    Mondo,
    /// OMIM id.
    Omim,
    /// SNOMED CT id.
    Snomedct,
    /// UMLS CUI.
    Umls,
    /// Orphanet id.
    Orpha,
    /// MeSH descriptor id.
    Mesh,
    /// Disease Ontology id.
    Doid,
    /// ICD-10 code, including range notation expanded at ingest.
    Icd10,
}

impl Namespace {
    /// Parse a namespace from its lower-case external name, e.g. `"entrez"`.
    ///
    /// Returns `None` for anything not in the closed set; callers should
    /// surface this as [`crate::core::errors::CoherenceError::unknown_id_type`].
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "entrez" | "entrezgene" => Namespace::Entrez,
            "ensembl" | "ensembl.gene" => Namespace::Ensembl,
            "symbol" => Namespace::Symbol,
            "uniprot" | "uniprot.swiss-prot" => Namespace::Uniprot,
            "mondo" => Namespace::Mondo,
            "omim" => Namespace::Omim,
            "snomedct" => Namespace::Snomedct,
            "umls" => Namespace::Umls,
            "orpha" => Namespace::Orpha,
            "mesh" => Namespace::Mesh,
            "doid" => Namespace::Doid,
            "icd10" | "icd-10" => Namespace::Icd10,
            _ => return None,
        })
    }

    /// The domain this namespace belongs to.
    pub fn domain(&self) -> Domain {
        match self {
            Namespace::Entrez | Namespace::Ensembl | Namespace::Symbol | Namespace::Uniprot => {
                Domain::Gene
            }
            Namespace::Mondo
            | Namespace::Omim
            | Namespace::Snomedct
            | Namespace::Umls
            | Namespace::Orpha
            | Namespace::Mesh
            | Namespace::Doid
            | Namespace::Icd10 => Domain::Disease,
        }
    }

    /// Whether this is the canonical namespace for its domain.
    pub fn is_canonical(&self) -> bool {
        matches!(self, Namespace::Entrez | Namespace::Mondo)
    }

    /// Every namespace defined for `domain`, canonical namespace first.
    pub fn all_for(domain: Domain) -> &'static [Namespace] {
        const GENE_NAMESPACES: [Namespace; 4] = [
            Namespace::Entrez,
            Namespace::Ensembl,
            Namespace::Symbol,
            Namespace::Uniprot,
        ];
        const DISEASE_NAMESPACES: [Namespace; 8] = [
            Namespace::Mondo,
            Namespace::Omim,
            Namespace::Snomedct,
            Namespace::Umls,
            Namespace::Orpha,
            Namespace::Mesh,
            Namespace::Doid,
            Namespace::Icd10,
        ];
        match domain {
            Domain::Gene => &GENE_NAMESPACES,
            Domain::Disease => &DISEASE_NAMESPACES,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Namespace::Entrez => "entrez",
            Namespace::Ensembl => "ensembl",
            Namespace::Symbol => "symbol",
            Namespace::Uniprot => "uniprot",
            Namespace::Mondo => "mondo",
            Namespace::Omim => "omim",
            Namespace::Snomedct => "snomedct",
            Namespace::Umls => "umls",
            Namespace::Orpha => "orpha",
            Namespace::Mesh => "mesh",
            Namespace::Doid => "doid",
            Namespace::Icd10 => "icd10",
        };
        write!(f, "{name}")
    }
}

/// Attribute categories for gene entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneCategory {
    /// Gene Ontology biological process terms.
    GoBiologicalProcess,
    /// Gene Ontology cellular component terms.
    GoCellularComponent,
    /// Gene Ontology molecular function terms.
    GoMolecularFunction,
    /// KEGG pathway membership.
    PathwayKegg,
}

/// Attribute categories for disease entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiseaseCategory {
    /// Genes known to be related to the disease.
    RelatedGenes,
    /// Variants known to be related to the disease.
    RelatedVariants,
    /// Pathways known to be related to the disease.
    RelatedPathways,
}

/// A closed attribute category, tagged by the domain it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// A gene annotation category.
    Gene(GeneCategory),
    /// A disease annotation category.
    Disease(DiseaseCategory),
}

impl Category {
    /// All categories defined for a domain, in a stable order.
    pub fn all_for(domain: Domain) -> &'static [Category] {
        use Category::{Disease, Gene};
        use DiseaseCategory::{RelatedGenes, RelatedPathways, RelatedVariants};
        use GeneCategory::{
            GoBiologicalProcess, GoCellularComponent, GoMolecularFunction, PathwayKegg,
        };

        const GENE_CATEGORIES: [Category; 4] = [
            Gene(GoBiologicalProcess),
            Gene(GoCellularComponent),
            Gene(GoMolecularFunction),
            Gene(PathwayKegg),
        ];
        const DISEASE_CATEGORIES: [Category; 3] =
            [Disease(RelatedGenes), Disease(RelatedVariants), Disease(RelatedPathways)];

        match domain {
            Domain::Gene => &GENE_CATEGORIES,
            Domain::Disease => &DISEASE_CATEGORIES,
        }
    }

    /// The domain this category applies to.
    pub fn domain(&self) -> Domain {
        match self {
            Category::Gene(_) => Domain::Gene,
            Category::Disease(_) => Domain::Disease,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Gene(GeneCategory::GoBiologicalProcess) => "go.BP",
            Category::Gene(GeneCategory::GoCellularComponent) => "go.CC",
            Category::Gene(GeneCategory::GoMolecularFunction) => "go.MF",
            Category::Gene(GeneCategory::PathwayKegg) => "pathway.kegg",
            Category::Disease(DiseaseCategory::RelatedGenes) => "related_genes",
            Category::Disease(DiseaseCategory::RelatedVariants) => "related_variants",
            Category::Disease(DiseaseCategory::RelatedPathways) => "related_pathways",
        };
        write!(f, "{name}")
    }
}

/// Dense entity index assigned by the [`crate::registry::IdentifierRegistry`].
///
/// Indices are monotonic and domain-scoped: a gene index and a disease index
/// with the same numeric value refer to different entities.
pub type EntityIndex = u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_parse_roundtrips_display() {
        for ns in [
            Namespace::Entrez,
            Namespace::Ensembl,
            Namespace::Symbol,
            Namespace::Uniprot,
            Namespace::Mondo,
            Namespace::Omim,
            Namespace::Snomedct,
            Namespace::Umls,
            Namespace::Orpha,
            Namespace::Mesh,
            Namespace::Doid,
            Namespace::Icd10,
        ] {
            assert_eq!(Namespace::parse(&ns.to_string()), Some(ns));
        }
    }

    #[test]
    fn namespace_domain_assignment() {
        assert_eq!(Namespace::Entrez.domain(), Domain::Gene);
        assert_eq!(Namespace::Icd10.domain(), Domain::Disease);
        assert!(Namespace::Entrez.is_canonical());
        assert!(!Namespace::Ensembl.is_canonical());
    }

    #[test]
    fn namespace_all_for_domain() {
        assert_eq!(Namespace::all_for(Domain::Gene).len(), 4);
        assert_eq!(Namespace::all_for(Domain::Disease).len(), 8);
        assert_eq!(Namespace::all_for(Domain::Gene)[0], Namespace::Entrez);
        assert_eq!(Namespace::all_for(Domain::Disease)[0], Namespace::Mondo);
        for ns in Namespace::all_for(Domain::Disease) {
            assert_eq!(ns.domain(), Domain::Disease);
        }
    }

    #[test]
    fn category_all_for_domain() {
        assert_eq!(Category::all_for(Domain::Gene).len(), 4);
        assert_eq!(Category::all_for(Domain::Disease).len(), 3);
        for category in Category::all_for(Domain::Gene) {
            assert_eq!(category.domain(), Domain::Gene);
        }
    }

    #[test]
    fn category_display_uses_short_category_names() {
        assert_eq!(
            Category::Gene(GeneCategory::GoBiologicalProcess).to_string(),
            "go.BP"
        );
        assert_eq!(
            Category::Disease(DiseaseCategory::RelatedPathways).to_string(),
            "related_pathways"
        );
    }
}
